//! Campus network check.
//!
//! A caller is on campus when the first two dotted segments of its address equal the first
//! two segments of some range's base address. The prefix length after `/` is ignored.

const IPV4_MAPPED_PREFIX: &str = "::ffff:";

pub fn is_campus_ip(ip: Option<&str>, ranges: &[String]) -> bool {
    let Some(ip) = ip.map(str::trim).filter(|ip| !ip.is_empty()) else {
        return false;
    };
    let ip = strip_ipv4_mapped(ip);
    let Some(caller) = leading_segments(ip) else {
        return false;
    };

    ranges.iter().any(|range| {
        let base = range.split('/').next().unwrap_or_default().trim();
        leading_segments(base) == Some(caller)
    })
}

fn strip_ipv4_mapped(ip: &str) -> &str {
    match ip.get(..IPV4_MAPPED_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(IPV4_MAPPED_PREFIX) => {
            &ip[IPV4_MAPPED_PREFIX.len()..]
        }
        _ => ip,
    }
}

fn leading_segments(addr: &str) -> Option<(&str, &str)> {
    let mut parts = addr.split('.');
    let first = parts.next().filter(|s| !s.is_empty())?;
    let second = parts.next().filter(|s| !s.is_empty())?;
    Some((first, second))
}
