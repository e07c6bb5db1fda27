//! Fuzz target: learned-settings blob decoder
//!
//! Feeds arbitrary bytes to `LearnedSettings::from_bytes` and verifies:
//! - No panics under arbitrary input
//! - Every accepted blob holds gains inside `GAIN_LIMITS`
//! - Every accepted blob re-encodes to bytes that decode to the same value
//!
//! cargo fuzz run fuzz_learned_settings

#![no_main]

use fermctl::control::overshoot::GAIN_LIMITS;
use fermctl::settings::LearnedSettings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(settings) = LearnedSettings::from_bytes(data) else {
        return;
    };
    let limits = GAIN_LIMITS.0..=GAIN_LIMITS.1;
    assert!(limits.contains(&settings.heat_overshoot));
    assert!(limits.contains(&settings.cool_overshoot));
    assert!(settings.to_estimator().is_ok());

    let bytes = settings.to_bytes().expect("valid settings encode");
    assert_eq!(LearnedSettings::from_bytes(&bytes), Ok(settings));
});
