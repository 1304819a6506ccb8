use crate::domain::LocationEntry;

/// One search query per keyword, in keyword order.
///
/// Duplicate keywords produce duplicate queries, dedupe upstream if needed.
pub fn generate_queries(
    keywords: &[String],
    location: &LocationEntry,
    domestic_country: &str,
) -> Vec<String> {
    let place = match (location.is_in(domestic_country), location.state()) {
        (true, Some(state)) => format!("{}, {}", location.name.trim(), state),
        (true, None) => location.name.trim().to_string(),
        (false, _) => format!("{}, {}", location.name.trim(), location.country.trim()),
    };

    keywords
        .iter()
        .map(|keyword| build_search_query(keyword, &place))
        .collect()
}

fn build_search_query(keyword: &str, place: &str) -> String {
    format!("{} in {}", keyword.trim(), place)
}

#[cfg(test)]
mod tests {
    use super::generate_queries;
    use crate::domain::LocationEntry;

    const DOMESTIC: &str = "United States";

    fn location(city: &str, state: Option<&str>, country: &str) -> LocationEntry {
        LocationEntry {
            id: "loc".to_string(),
            name: city.to_string(),
            state_or_province: state.map(|s| s.to_string()),
            country: country.to_string(),
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn domestic_with_state() {
        let loc = location("Austin", Some("Texas"), "United States");
        let queries = generate_queries(&keywords(&["Dentist"]), &loc, DOMESTIC);

        assert_eq!(queries, vec!["Dentist in Austin, Texas"]);
    }

    #[test]
    fn domestic_without_state() {
        let loc = location("Austin", None, "united states");
        let queries = generate_queries(&keywords(&["Plumber"]), &loc, DOMESTIC);

        assert_eq!(queries, vec!["Plumber in Austin"]);
    }

    #[test]
    fn foreign_country_never_includes_state() {
        let loc = location("Toronto", Some("Ontario"), "Canada");
        let queries = generate_queries(&keywords(&["Bakery"]), &loc, DOMESTIC);

        assert_eq!(queries, vec!["Bakery in Toronto, Canada"]);
        assert!(queries.iter().all(|q| q.ends_with(", Canada")));
        assert!(!queries[0].contains("Ontario"));
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let loc = location("Austin", Some("Texas"), "United States");
        let queries = generate_queries(
            &keywords(&["Orthodontist", "Dentist", "Orthodontist"]),
            &loc,
            DOMESTIC,
        );

        assert_eq!(
            queries,
            vec![
                "Orthodontist in Austin, Texas",
                "Dentist in Austin, Texas",
                "Orthodontist in Austin, Texas",
            ]
        );
    }

    #[test]
    fn no_keywords_no_queries() {
        let loc = location("Austin", None, "United States");
        assert!(generate_queries(&[], &loc, DOMESTIC).is_empty());
    }
}
