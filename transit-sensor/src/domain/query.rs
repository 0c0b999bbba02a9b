//! Station query: what to fetch and how to filter it.

use regex::Regex;

/// Error returned when a station query cannot be built from configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidQuery {
    /// The station id was empty or whitespace.
    #[error("station id must not be empty")]
    EmptyStationId,

    /// The destination filter is not a valid regular expression.
    #[error("invalid destination filter {pattern:?}: {message}")]
    InvalidDestinationFilter { pattern: String, message: String },
}

/// Identifies a station to poll and the filters applied to its departures.
///
/// Empty filter strings are treated as "no filter", matching how the
/// options form stores unset fields.
///
/// # Examples
///
/// ```
/// use transit_sensor::domain::StationQuery;
///
/// let query = StationQuery::new("de:08222:2417")
///     .unwrap()
///     .with_platform("A")
///     .with_line("");
///
/// assert_eq!(query.platform(), Some("A"));
/// assert_eq!(query.line(), None);
/// assert!(StationQuery::new("  ").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct StationQuery {
    station_id: String,
    name: Option<String>,
    platform: Option<String>,
    line: Option<String>,
    destination_filter: Option<Regex>,
    radius: Option<u32>,
}

impl StationQuery {
    /// Create a query for the given backend station id.
    pub fn new(station_id: impl Into<String>) -> Result<Self, InvalidQuery> {
        let station_id = station_id.into().trim().to_string();
        if station_id.is_empty() {
            return Err(InvalidQuery::EmptyStationId);
        }

        Ok(Self {
            station_id,
            name: None,
            platform: None,
            line: None,
            destination_filter: None,
            radius: None,
        })
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    /// Only keep departures from this platform.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = non_empty(platform.into());
        self
    }

    /// Only keep departures of this line.
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = non_empty(line.into());
        self
    }

    /// Only keep departures whose destination matches `pattern` anywhere.
    pub fn with_destination_filter(mut self, pattern: &str) -> Result<Self, InvalidQuery> {
        if pattern.is_empty() {
            self.destination_filter = None;
            return Ok(self);
        }

        let regex = Regex::new(pattern).map_err(|e| InvalidQuery::InvalidDestinationFilter {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.destination_filter = Some(regex);
        Ok(self)
    }

    /// Set the search radius in meters (Motis only).
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The configured name, or the station id when no name is set.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.station_id)
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    pub fn destination_filter(&self) -> Option<&Regex> {
        self.destination_filter.as_ref()
    }

    pub fn radius(&self) -> Option<u32> {
        self.radius
    }

    /// Whether a departure with these labels passes the platform, line and
    /// destination filters. Unset filters always pass.
    pub fn accepts(&self, platform: &str, line: &str, destination: &str) -> bool {
        if let Some(wanted) = &self.platform
            && wanted != platform
        {
            return false;
        }

        if let Some(wanted) = &self.line
            && wanted != line
        {
            return false;
        }

        match &self.destination_filter {
            Some(regex) => regex.is_match(destination),
            None => true,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_id_is_trimmed() {
        let query = StationQuery::new("  2417 ").unwrap();
        assert_eq!(query.station_id(), "2417");
    }

    #[test]
    fn empty_station_id_rejected() {
        assert_eq!(
            StationQuery::new("").unwrap_err(),
            InvalidQuery::EmptyStationId
        );
    }

    #[test]
    fn invalid_regex_rejected() {
        let err = StationQuery::new("2417")
            .unwrap()
            .with_destination_filter("(unclosed")
            .unwrap_err();
        assert!(matches!(err, InvalidQuery::InvalidDestinationFilter { .. }));
    }

    #[test]
    fn unset_filters_accept_everything() {
        let query = StationQuery::new("2417").unwrap();
        assert!(query.accepts("", "", ""));
        assert!(query.accepts("A", "5", "Weinheim"));
    }

    #[test]
    fn platform_filter_is_exact() {
        let query = StationQuery::new("2417").unwrap().with_platform("A");
        assert!(query.accepts("A", "5", "Weinheim"));
        assert!(!query.accepts("B", "5", "Weinheim"));
        assert!(!query.accepts("", "5", "Weinheim"));
        assert!(!query.accepts("AA", "5", "Weinheim"));
    }

    #[test]
    fn line_filter_is_exact() {
        let query = StationQuery::new("2417").unwrap().with_line("5");
        assert!(query.accepts("A", "5", "Weinheim"));
        assert!(!query.accepts("A", "5A", "Weinheim"));
        assert!(!query.accepts("A", "", "Weinheim"));
    }

    #[test]
    fn destination_filter_is_a_search() {
        let query = StationQuery::new("2417")
            .unwrap()
            .with_destination_filter("Heidel")
            .unwrap();
        assert!(query.accepts("", "", "Heidelberg Hbf"));
        assert!(query.accepts("", "", "Bf Heidelberg-Kirchheim"));
        assert!(!query.accepts("", "", "Mannheim"));
    }

    #[test]
    fn empty_destination_filter_clears() {
        let query = StationQuery::new("2417")
            .unwrap()
            .with_destination_filter("Heidel")
            .unwrap()
            .with_destination_filter("")
            .unwrap();
        assert!(query.destination_filter().is_none());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let query = StationQuery::new("2417").unwrap();
        assert_eq!(query.display_name(), "2417");
        let query = query.with_name("Bismarckplatz");
        assert_eq!(query.display_name(), "Bismarckplatz");
    }
}
