/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV: f64 = 8.617333262e-5;

/// Converts a pressure-volume product from bar·Å³ to eV.
pub const BAR_A3_TO_EV: f64 = 6.241509074e-7;
