use serde::{Deserialize, Serialize};

/// Sky condition codes reported by the weather endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sky {
    #[default]
    ClearDay,
    ClearNight,
    PartlyCloudyDay,
    PartlyCloudyNight,
    Cloudy,
    Wind,
    LightRain,
    ModerateRain,
    HeavyRain,
    StormRain,
    ThunderShower,
    Sleet,
    LightSnow,
    ModerateSnow,
    HeavySnow,
    StormSnow,
    Hail,
    LightHaze,
    ModerateHaze,
    HeavyHaze,
    Fog,
    Dust,
}

impl Sky {
    pub const fn all() -> &'static [Sky] {
        &[
            Sky::ClearDay,
            Sky::ClearNight,
            Sky::PartlyCloudyDay,
            Sky::PartlyCloudyNight,
            Sky::Cloudy,
            Sky::Wind,
            Sky::LightRain,
            Sky::ModerateRain,
            Sky::HeavyRain,
            Sky::StormRain,
            Sky::ThunderShower,
            Sky::Sleet,
            Sky::LightSnow,
            Sky::ModerateSnow,
            Sky::HeavySnow,
            Sky::StormSnow,
            Sky::Hail,
            Sky::LightHaze,
            Sky::ModerateHaze,
            Sky::HeavyHaze,
            Sky::Fog,
            Sky::Dust,
        ]
    }

    /// Map an upstream code. Unknown codes are shown as clear sky.
    pub fn from_code(code: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|sky| sky.code() == code)
            .unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Sky::ClearDay => "CLEAR_DAY",
            Sky::ClearNight => "CLEAR_NIGHT",
            Sky::PartlyCloudyDay => "PARTLY_CLOUDY_DAY",
            Sky::PartlyCloudyNight => "PARTLY_CLOUDY_NIGHT",
            Sky::Cloudy => "CLOUDY",
            Sky::Wind => "WIND",
            Sky::LightRain => "LIGHT_RAIN",
            Sky::ModerateRain => "MODERATE_RAIN",
            Sky::HeavyRain => "HEAVY_RAIN",
            Sky::StormRain => "STORM_RAIN",
            Sky::ThunderShower => "THUNDER_SHOWER",
            Sky::Sleet => "SLEET",
            Sky::LightSnow => "LIGHT_SNOW",
            Sky::ModerateSnow => "MODERATE_SNOW",
            Sky::HeavySnow => "HEAVY_SNOW",
            Sky::StormSnow => "STORM_SNOW",
            Sky::Hail => "HAIL",
            Sky::LightHaze => "LIGHT_HAZE",
            Sky::ModerateHaze => "MODERATE_HAZE",
            Sky::HeavyHaze => "HEAVY_HAZE",
            Sky::Fog => "FOG",
            Sky::Dust => "DUST",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Sky::ClearDay | Sky::ClearNight => "Clear",
            Sky::PartlyCloudyDay | Sky::PartlyCloudyNight => "Partly cloudy",
            Sky::Cloudy => "Overcast",
            Sky::Wind => "Windy",
            Sky::LightRain => "Light rain",
            Sky::ModerateRain => "Moderate rain",
            Sky::HeavyRain => "Heavy rain",
            Sky::StormRain => "Rainstorm",
            Sky::ThunderShower => "Thunder shower",
            Sky::Sleet => "Sleet",
            Sky::LightSnow => "Light snow",
            Sky::ModerateSnow => "Moderate snow",
            Sky::HeavySnow => "Heavy snow",
            Sky::StormSnow => "Snowstorm",
            Sky::Hail => "Hail",
            Sky::LightHaze => "Light haze",
            Sky::ModerateHaze => "Moderate haze",
            Sky::HeavyHaze => "Heavy haze",
            Sky::Fog => "Fog",
            Sky::Dust => "Dust",
        }
    }
}

impl std::fmt::Display for Sky {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
