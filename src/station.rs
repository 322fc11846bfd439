/// The monitored tide station.
///
/// The service serves exactly one CO-OPS station. Its metadata lives here so
/// the rest of the crate refers to `STATION` instead of hardcoding the id.

use crate::model::Product;

/// Metadata for a CO-OPS water level station.
#[derive(Debug)]
pub struct Station {
    /// 7-digit CO-OPS station id.
    pub station_id: &'static str,
    /// Official CO-OPS station name.
    pub name: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Datum requested when the configuration does not name one.
    pub default_datum: &'static str,
    /// Products the station publishes at six-minute resolution.
    pub products: &'static [Product],
}

/// San Francisco, CA. Long-running NWLON station with both observed water
/// levels and harmonic predictions.
pub static STATION: Station = Station {
    station_id: "9414290",
    name: "San Francisco, CA",
    latitude: 37.8063,
    longitude: -122.4659,
    default_datum: "MLLW",
    products: &[Product::WaterLevel, Product::Predictions],
};

/// CO-OPS station ids are exactly seven ASCII digits.
pub fn is_valid_station_id(id: &str) -> bool {
    id.len() == 7 && id.chars().all(|c| c.is_ascii_digit())
}

impl Station {
    pub fn offers(&self, product: Product) -> bool {
        self.products.contains(&product)
    }
}
