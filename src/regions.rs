// src/regions.rs
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    All,
    MiddleEast,
    Europe,
    EastAsia,
    Africa,
    Americas,
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Region::All),
            "middle-east" => Ok(Region::MiddleEast),
            "europe" => Ok(Region::Europe),
            "east-asia" => Ok(Region::EastAsia),
            "africa" => Ok(Region::Africa),
            "americas" => Ok(Region::Americas),
            other => anyhow::bail!("unknown region: {other}"),
        }
    }
}

fn keywords(region: Region) -> &'static [&'static str] {
    match region {
        Region::All => &[],
        Region::MiddleEast => &[
            "iran", "israel", "palestine", "gaza", "west bank", "lebanon", "syria", "iraq",
            "yemen", "saudi", "turkey", "egypt", "jordan", "kuwait", "uae", "bahrain", "qatar",
            "oman", "tehran", "isfahan", "natanz", "bushehr", "tel aviv", "jerusalem", "beirut",
            "damascus", "baghdad", "riyadh", "hormuz", "persian gulf", "red sea", "hezbollah",
            "houthi", "irgc", "netanyahu", "khamenei", "idf", "middle east", "mideast", "suez",
            "golan", "rafah", "erbil", "basra", "sanaa", "aden", "ankara", "istanbul", "cairo",
            "fordow", "arak", "nuclear",
        ],
        Region::Europe => &[
            "ukraine", "russia", "kyiv", "moscow", "kharkiv", "crimea", "donbas", "nato",
            "london", "paris", "berlin", "brussels", "uk", "france", "germany", "poland",
            "romania", "baltic", "finland", "sweden", "norway", "europe", "european",
        ],
        Region::EastAsia => &[
            "taiwan", "china", "beijing", "taipei", "north korea", "south korea", "pyongyang",
            "seoul", "japan", "tokyo", "south china sea", "taiwan strait", "okinawa", "pacific",
        ],
        Region::Africa => &[
            "sudan", "khartoum", "somalia", "mogadishu", "libya", "ethiopia", "nigeria", "congo",
            "sahel", "mali", "niger", "chad", "burkina", "mozambique", "africa",
        ],
        Region::Americas => &[
            "washington", "pentagon", "new york", "united states", "usa", "mexico", "venezuela",
            "colombia", "brazil", "canada",
        ],
    }
}

/// Substring match of the region's keywords against text or country.
pub fn matches_region(region: Region, text: &str, country: Option<&str>) -> bool {
    if region == Region::All {
        return true;
    }
    let lower = text.to_lowercase();
    let country = country.unwrap_or_default().to_lowercase();
    keywords(region)
        .iter()
        .any(|kw| lower.contains(kw) || country.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_matches_everything() {
        assert!(matches_region(Region::All, "", None));
    }

    #[test]
    fn text_or_country_matches() {
        assert!(matches_region(Region::MiddleEast, "Strikes near Beirut", None));
        assert!(matches_region(Region::EastAsia, "Drills continue", Some("Taiwan")));
        assert!(!matches_region(Region::Africa, "Drills continue", Some("Taiwan")));
    }

    #[test]
    fn parses_kebab_names() {
        assert_eq!("middle-east".parse::<Region>().unwrap(), Region::MiddleEast);
        assert_eq!("".parse::<Region>().unwrap(), Region::All);
        assert!("atlantis".parse::<Region>().is_err());
    }
}
