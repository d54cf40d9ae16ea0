//! Portal-file ingest grammar (spec §6). Lives in the CLI, not the core —
//! the core only ever sees a fully-formed `Vec<Portal>`.

use std::collections::HashSet;

use fieldplan_core::Portal;
use tracing::warn;

use crate::errors::PortalFileError;

/// Parses a portal file, one portal per non-blank/non-comment line.
/// Duplicate-coordinate lines are skipped with a warning rather than
/// rejected (spec §6).
pub fn parse(contents: &str) -> Result<Vec<Portal>, PortalFileError> {
    let mut portals = Vec::new();
    let mut seen_coords: HashSet<(u64, u64)> = HashSet::new();
    let mut inbound_seen = false;

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw_line.find('#') {
            Some(at) => &raw_line[..at],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(';').map(str::trim);
        let name = fields.next().unwrap_or("").to_string();

        let mut pll: Option<(f64, f64)> = None;
        let mut keys: Option<u32> = None;
        let mut sbul = false;
        let mut inbound = false;

        for field in fields {
            if field.is_empty() {
                continue;
            }
            if field.contains("pll=") {
                if pll.is_some() {
                    return Err(PortalFileError::MultiplePllUrls { line: line_no });
                }
                pll = Some(parse_pll(field, line_no)?);
            } else if let Ok(n) = field.parse::<u32>() {
                if keys.is_some() {
                    return Err(PortalFileError::MultipleKeyCounts { line: line_no });
                }
                keys = Some(n);
            } else if field.eq_ignore_ascii_case("sbul") {
                if sbul {
                    return Err(PortalFileError::MultipleSbulTokens { line: line_no });
                }
                sbul = true;
            } else if field.eq_ignore_ascii_case("inbound") {
                inbound = true;
            } else if field.eq_ignore_ascii_case("undefined") {
                // recognised, no-op
            } else {
                return Err(PortalFileError::UnrecognizedToken { line: line_no, token: field.to_string() });
            }
        }

        let Some((lat, lon)) = pll else {
            return Err(PortalFileError::MissingPllUrl { line: line_no });
        };
        if sbul && inbound {
            return Err(PortalFileError::SbulAndInbound { line: line_no });
        }
        if inbound {
            if inbound_seen {
                return Err(PortalFileError::MultipleInboundPortals { line: line_no });
            }
            inbound_seen = true;
        }

        let coord_key = (lon.to_bits(), lat.to_bits());
        if !seen_coords.insert(coord_key) {
            warn!(line = line_no, %name, "duplicate portal coordinates, skipping");
            continue;
        }

        let mut portal = Portal::new(name, lon, lat);
        portal.keys = keys.unwrap_or(0);
        portal.sbul = sbul;
        portal.inbound = inbound;
        portals.push(portal);
    }

    if inbound_seen {
        warn!("inbound flag is recognised but not enforced by the builder");
    }

    Ok(portals)
}

/// Pulls `lat,lon` out of a field containing `pll=`, per spec §6 ("decimal
/// degrees latitude then longitude").
fn parse_pll(field: &str, line_no: usize) -> Result<(f64, f64), PortalFileError> {
    let at = field.find("pll=").unwrap();
    let rest = &field[at + "pll=".len()..];
    let coord_str: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    let mut parts = coord_str.split(',');
    let lat = parts
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PortalFileError::InvalidPllCoordinates { line: line_no, raw: field.to_string() })?;
    let lon = parts
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PortalFileError::InvalidPllCoordinates { line: line_no, raw: field.to_string() })?;
    if parts.next().is_some() {
        return Err(PortalFileError::InvalidPllCoordinates { line: line_no, raw: field.to_string() });
    }
    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_portal_line() {
        let input = "Some Portal; https://intel.ingress.com/intel?pll=40.7128,-74.0060; 3";
        let portals = parse(input).unwrap();
        assert_eq!(portals.len(), 1);
        assert_eq!(portals[0].name, "Some Portal");
        assert_eq!(portals[0].lat, 40.7128);
        assert_eq!(portals[0].lon, -74.0060);
        assert_eq!(portals[0].keys, 3);
        assert!(!portals[0].sbul);
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let input = "# header\n\n   \nA; pll=1.0,2.0\n";
        let portals = parse(input).unwrap();
        assert_eq!(portals.len(), 1);
    }

    #[test]
    fn inline_comment_truncates_the_line() {
        let input = "A; pll=1.0,2.0 # trailing note";
        let portals = parse(input).unwrap();
        assert_eq!(portals.len(), 1);
    }

    #[test]
    fn sets_sbul_flag() {
        let input = "A; pll=1.0,2.0; sbul";
        let portals = parse(input).unwrap();
        assert!(portals[0].sbul);
    }

    #[test]
    fn missing_pll_url_is_an_error() {
        let input = "A; 3";
        assert!(matches!(parse(input), Err(PortalFileError::MissingPllUrl { line: 1 })));
    }

    #[test]
    fn sbul_and_inbound_together_is_an_error() {
        let input = "A; pll=1.0,2.0; sbul; inbound";
        assert!(matches!(parse(input), Err(PortalFileError::SbulAndInbound { line: 1 })));
    }

    #[test]
    fn second_inbound_portal_is_an_error() {
        let input = "A; pll=1.0,2.0; inbound\nB; pll=3.0,4.0; inbound";
        assert!(matches!(parse(input), Err(PortalFileError::MultipleInboundPortals { line: 2 })));
    }

    #[test]
    fn duplicate_coordinates_are_skipped_not_rejected() {
        let input = "A; pll=1.0,2.0\nB; pll=1.0,2.0";
        let portals = parse(input).unwrap();
        assert_eq!(portals.len(), 1);
        assert_eq!(portals[0].name, "A");
    }

    #[test]
    fn unrecognised_token_is_an_error() {
        let input = "A; pll=1.0,2.0; bogus";
        assert!(matches!(parse(input), Err(PortalFileError::UnrecognizedToken { .. })));
    }
}
