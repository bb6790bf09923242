pub mod doctor;
pub mod generate;
pub mod onboard;
pub mod seed_tones;
pub mod serve;
