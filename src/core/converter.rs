/// 同一個攝氏讀數換算出的三種溫標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureScales {
    pub celsius: f64,
    pub fahrenheit: f64,
    pub kelvin: f64,
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + 273.15
}

pub fn convert(celsius: f64) -> TemperatureScales {
    TemperatureScales {
        celsius,
        fahrenheit: celsius_to_fahrenheit(celsius),
        kelvin: celsius_to_kelvin(celsius),
    }
}
