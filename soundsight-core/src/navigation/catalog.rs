//! Quick destinations and their routes.
//!
//! Until a routing collaborator exists every destination resolves to the same
//! indoor demo route.

use serde::Serialize;

use super::{NavigationStep, StepDirection};
use crate::error::{Result, SoundSightError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub name: &'static str,
    pub icon: &'static str,
    /// Estimated walking time label.
    pub eta: &'static str,
}

pub static DESTINATIONS: [Destination; 6] = [
    Destination { name: "Nearest Exit", icon: "exit", eta: "2 min" },
    Destination { name: "Restroom", icon: "restroom", eta: "1 min" },
    Destination { name: "Elevator", icon: "elevator", eta: "3 min" },
    Destination { name: "Information Desk", icon: "info", eta: "4 min" },
    Destination { name: "Café", icon: "cafe", eta: "5 min" },
    Destination { name: "Main Entrance", icon: "entrance", eta: "6 min" },
];

/// Look up a destination by name, ignoring case and surrounding whitespace.
pub fn find(name: &str) -> Option<&'static Destination> {
    let wanted = name.trim().to_lowercase();
    DESTINATIONS.iter().find(|d| d.name.to_lowercase() == wanted)
}

/// Resolve `name` to its catalog entry and route.
///
/// # Errors
/// `UnknownDestination` when `name` is not in [`DESTINATIONS`].
pub fn route_for(name: &str) -> Result<(&'static Destination, Vec<NavigationStep>)> {
    let destination =
        find(name).ok_or_else(|| SoundSightError::UnknownDestination(name.trim().to_string()))?;
    Ok((destination, demo_route()))
}

/// Six-step hallway route used by every quick destination.
pub fn demo_route() -> Vec<NavigationStep> {
    vec![
        NavigationStep::new("Walk straight for 15 meters", "15m", StepDirection::Straight, &[]),
        NavigationStep::new("Turn right at the door", "2m", StepDirection::Right, &["door frame"]),
        NavigationStep::new(
            "Walk straight for 8 meters",
            "8m",
            StepDirection::Straight,
            &["person ahead"],
        ),
        NavigationStep::new("Turn left at the end of the hallway", "1m", StepDirection::Left, &[]),
        NavigationStep::new("Walk straight for 5 meters", "5m", StepDirection::Straight, &[]),
        NavigationStep::new(
            "You have arrived at your destination",
            "0m",
            StepDirection::Arrived,
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_route_ends_with_arrival() {
        let route = demo_route();
        assert_eq!(route.len(), 6);
        assert_eq!(route.last().map(|s| s.direction), Some(StepDirection::Arrived));
        assert!(route[..5].iter().all(|s| s.direction != StepDirection::Arrived));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find("  café ").map(|d| d.eta), Some("5 min"));
        assert_eq!(find("RESTROOM").map(|d| d.icon), Some("restroom"));
        assert!(find("Rooftop").is_none());
    }

    #[test]
    fn unknown_destination_is_an_error() {
        let err = route_for("Rooftop").unwrap_err();
        assert!(matches!(err, SoundSightError::UnknownDestination(ref n) if n == "Rooftop"));
    }
}
