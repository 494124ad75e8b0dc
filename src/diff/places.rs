//! Destination names and the static travel-time table.

/// Flight time in minutes for each ticket class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelTimes {
    pub standard: u32,
    pub airstrip: u32,
    pub business: u32,
}

const fn times(standard: u32, airstrip: u32, business: u32) -> TravelTimes {
    TravelTimes {
        standard,
        airstrip,
        business,
    }
}

const TRAVEL_TIMES: [(&str, TravelTimes); 11] = [
    ("Mexico", times(26, 18, 8)),
    ("Cayman Islands", times(35, 25, 11)),
    ("Canada", times(41, 29, 12)),
    ("Hawaii", times(134, 94, 40)),
    ("United Kingdom", times(159, 111, 48)),
    ("Argentina", times(167, 117, 50)),
    ("Switzerland", times(175, 123, 53)),
    ("Japan", times(225, 158, 68)),
    ("China", times(242, 169, 72)),
    ("United Arab Emirates", times(271, 190, 81)),
    ("South Africa", times(297, 208, 89)),
];

const ALIASES: [(&str, &str); 2] = [("UAE", "United Arab Emirates"), ("UK", "United Kingdom")];

/// Maps short names Torn uses in descriptions onto table keys.
pub fn normalize_place(place: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == place)
        .map_or(place, |(_, full)| *full)
}

pub fn travel_times(place: &str) -> Option<TravelTimes> {
    TRAVEL_TIMES
        .iter()
        .find(|(name, _)| *name == place)
        .map(|(_, times)| *times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_expand() {
        assert_eq!(normalize_place("UAE"), "United Arab Emirates");
        assert_eq!(normalize_place("UK"), "United Kingdom");
        assert_eq!(normalize_place("United Kingdom"), "United Kingdom");
        assert_eq!(normalize_place("Mexico"), "Mexico");
    }

    #[test]
    fn known_destinations() {
        assert_eq!(travel_times("Mexico"), Some(times(26, 18, 8)));
        assert_eq!(travel_times("Japan"), Some(times(225, 158, 68)));
        assert_eq!(
            travel_times(normalize_place("UAE")),
            Some(times(271, 190, 81))
        );
    }

    #[test]
    fn unknown_destination_has_no_times() {
        assert_eq!(travel_times("Atlantis"), None);
        assert_eq!(travel_times("Unknown"), None);
        assert_eq!(travel_times("mexico"), None);
    }
}
