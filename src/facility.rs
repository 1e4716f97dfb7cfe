// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO facility adapter: site metadata, observation forms and P2 tool links.

use crate::models::P2Environment;
use serde::Serialize;

/// A fixed ESO observing site.
#[derive(Debug, Clone, Serialize)]
pub struct ObservingSite {
    pub name: &'static str,
    pub sitecode: &'static str,
    /// Degrees, negative south
    pub latitude: f64,
    /// Degrees, negative west
    pub longitude: f64,
    /// Meters
    pub elevation: f64,
}

// No ESO API serves this; values from the Paranal/La Silla site pages.
static SITES: [ObservingSite; 2] = [
    ObservingSite {
        name: "PARANAL",
        sitecode: "paranal",
        latitude: -24.62733,
        longitude: -70.40417,
        elevation: 2635.43,
    },
    ObservingSite {
        name: "LA_SILLA",
        sitecode: "lasilla",
        latitude: -29.25667,
        longitude: -70.73194,
        elevation: 2400.0,
    },
];

/// Observation types with a dedicated form.
static OBSERVATION_TYPES: [&str; 2] = ["XSHOOTER", "OB"];

/// Form shown for an observation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationForm {
    pub observation_type: String,
}

impl ObservationForm {
    pub fn render(&self) -> String {
        crate::forms::observation::render_observation_form(&self.observation_type)
    }
}

/// Facility context shown next to the observation form.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityContext {
    pub name: &'static str,
    pub version: &'static str,
    pub p2_username: Option<String>,
}

/// JSON description of the facility.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub sites: Vec<ObservingSite>,
    pub observation_types: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct EsoFacility;

impl EsoFacility {
    pub const NAME: &'static str = "ESO";
    pub const DEFAULT_OBSERVATION_TYPE: &'static str = "OB";

    pub fn observing_sites(&self) -> &'static [ObservingSite] {
        &SITES
    }

    /// Form for `observation_type`, falling back to the observation-block form.
    pub fn get_form(&self, observation_type: &str) -> ObservationForm {
        let wanted = observation_type.trim().to_ascii_uppercase();
        match OBSERVATION_TYPES.iter().find(|t| **t == wanted) {
            Some(t) => ObservationForm {
                observation_type: (*t).to_string(),
            },
            None => {
                tracing::debug!(observation_type, "Unknown observation type, using default form");
                ObservationForm {
                    observation_type: Self::DEFAULT_OBSERVATION_TYPE.to_string(),
                }
            }
        }
    }

    /// P2 tool page for an observation block.
    pub fn p2_tool_url(&self, environment: P2Environment, observation_block_id: i64) -> String {
        format!("{}/ob/{}", environment.p2_tool_url(), observation_block_id)
    }

    pub fn context_data(&self, p2_username: Option<String>) -> FacilityContext {
        FacilityContext {
            name: Self::NAME,
            version: env!("CARGO_PKG_VERSION"),
            p2_username,
        }
    }

    pub fn info(&self) -> FacilityInfo {
        FacilityInfo {
            name: Self::NAME,
            version: env!("CARGO_PKG_VERSION"),
            sites: self.observing_sites().to_vec(),
            observation_types: OBSERVATION_TYPES.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sites() {
        let info = EsoFacility.info();
        let codes: Vec<_> = info.sites.iter().map(|s| s.sitecode).collect();
        assert_eq!(codes, ["paranal", "lasilla"]);
        assert_eq!(info.sites[0].name, "PARANAL");
        assert_eq!(info.sites[0].elevation, 2635.43);
    }

    #[test]
    fn test_get_form_known_type() {
        let form = EsoFacility.get_form("xshooter");
        assert_eq!(form.observation_type, "XSHOOTER");
    }

    #[test]
    fn test_get_form_falls_back() {
        let form = EsoFacility.get_form("SPHERE");
        assert_eq!(form.observation_type, "OB");
    }

    #[test]
    fn test_p2_tool_url() {
        assert_eq!(
            EsoFacility.p2_tool_url(P2Environment::Demo, 1234),
            "https://www.eso.org/p2demo/home/ob/1234"
        );
        assert_eq!(
            EsoFacility.p2_tool_url(P2Environment::Production, 1234),
            "https://www.eso.org/p2/home/ob/1234"
        );
    }

    #[test]
    fn test_context_data() {
        let ctx = EsoFacility.context_data(Some("520520".to_string()));
        assert_eq!(ctx.name, "ESO");
        assert_eq!(ctx.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(ctx.p2_username.as_deref(), Some("520520"));
    }
}
