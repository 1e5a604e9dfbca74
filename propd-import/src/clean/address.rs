//! Address, state, and building-type standardization

use super::text;

/// Standard street-suffix and directional abbreviations
const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("street", "St"),
    ("avenue", "Ave"),
    ("boulevard", "Blvd"),
    ("drive", "Dr"),
    ("lane", "Ln"),
    ("road", "Rd"),
    ("court", "Ct"),
    ("place", "Pl"),
    ("terrace", "Ter"),
    ("parkway", "Pkwy"),
    ("highway", "Hwy"),
    ("circle", "Cir"),
    ("suite", "Ste"),
    ("apartment", "Apt"),
    ("north", "N"),
    ("south", "S"),
    ("east", "E"),
    ("west", "W"),
];

/// Standardize one street address line.
///
/// Word-wise: known long forms become their USPS-style abbreviation,
/// trailing periods on abbreviations are dropped, everything else is
/// left as typed.
pub fn standardize_address(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let stripped = word.trim_end_matches('.');
            let lower = stripped.to_lowercase();
            for (long, abbrev) in STREET_ABBREVIATIONS {
                if lower == *long || lower.eq_ignore_ascii_case(abbrev) {
                    return (*abbrev).to_string();
                }
            }
            stripped.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full US state names keyed to their two-letter codes
const STATE_CODES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
    ("district of columbia", "DC"),
];

/// Map a state/province to its two-letter code.
///
/// Full US names and already-valid codes map to the uppercase code;
/// anything else is passed through title-cased (non-US provinces).
pub fn standardize_state(value: &str) -> String {
    let lower = value.to_lowercase();
    for (name, code) in STATE_CODES {
        if lower == *name || lower.eq_ignore_ascii_case(code) {
            return (*code).to_string();
        }
    }
    if value.len() == 2 {
        return value.to_uppercase();
    }
    text::title_case(value)
}

/// Map free-form building descriptions onto the canonical vocabulary
pub fn map_building_type(value: &str) -> String {
    let token = text::to_token(value);
    match token.as_str() {
        "apt" | "apartment" | "flat" => "apartment".to_string(),
        "house" | "single_family" | "single_family_home" | "sfh" => "single_family".to_string(),
        "condo" | "condominium" => "condo".to_string(),
        "townhouse" | "townhome" => "townhouse".to_string(),
        "duplex" => "duplex".to_string(),
        "commercial" | "office" | "retail" => "commercial".to_string(),
        _ => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_street_abbreviation() {
        assert_eq!(standardize_address("12 Maple Street"), "12 Maple St");
        assert_eq!(standardize_address("7 Oak Ave."), "7 Oak Ave");
        assert_eq!(standardize_address("500 North Lamar Boulevard"), "500 N Lamar Blvd");
        // Already-abbreviated input is unchanged
        assert_eq!(standardize_address("12 Maple St"), "12 Maple St");
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(standardize_state("texas"), "TX");
        assert_eq!(standardize_state("Texas"), "TX");
        assert_eq!(standardize_state("tx"), "TX");
        assert_eq!(standardize_state("TX"), "TX");
        assert_eq!(standardize_state("ontario"), "Ontario");
    }

    #[test]
    fn test_building_type() {
        assert_eq!(map_building_type("Apt"), "apartment");
        assert_eq!(map_building_type("Single Family Home"), "single_family");
        assert_eq!(map_building_type("yurt"), "yurt");
    }
}
