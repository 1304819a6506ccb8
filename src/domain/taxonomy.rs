use serde::{Deserialize, Serialize};

/// An industry/category record with the keywords used to search for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyEntry {
    pub id: String,
    pub title: String,
    pub keyword_set: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
    pub id: String,
    /// City name.
    pub name: String,
    pub state_or_province: Option<String>,
    pub country: String,
}

impl LocationEntry {
    /// The state, when one is known and not blank.
    pub fn state(&self) -> Option<&str> {
        self.state_or_province
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_in(&self, country: &str) -> bool {
        self.country.trim().eq_ignore_ascii_case(country.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::LocationEntry;

    fn location(state: Option<&str>, country: &str) -> LocationEntry {
        LocationEntry {
            id: "loc-1".to_string(),
            name: "Austin".to_string(),
            state_or_province: state.map(|s| s.to_string()),
            country: country.to_string(),
        }
    }

    #[test]
    fn blank_state_is_no_state() {
        assert_eq!(location(Some("  "), "United States").state(), None);
        assert_eq!(location(None, "United States").state(), None);
        assert_eq!(location(Some("Texas"), "United States").state(), Some("Texas"));
    }

    #[test]
    fn country_match_ignores_case_and_padding() {
        assert!(location(None, " united states ").is_in("United States"));
        assert!(!location(None, "Canada").is_in("United States"));
    }
}
