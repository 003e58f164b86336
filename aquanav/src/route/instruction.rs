//! Turn-by-turn instruction text.
//!
//! The routing service only returns maneuver codes; the text shown to the
//! user is built here in the app locale (Indonesian).

use super::types::Maneuver;

/// Builds the instruction for a maneuver onto the named road.
pub fn instruction_text(maneuver: &Maneuver, road: &str) -> String {
    let direction = maneuver.modifier.as_deref().map(direction_phrase);

    let base = match maneuver.kind.as_str() {
        "depart" => "Mulai perjalanan".to_string(),
        "arrive" => return "Tiba di tujuan".to_string(),
        "roundabout" | "rotary" => "Masuk bundaran".to_string(),
        "exit roundabout" | "exit rotary" => "Keluar bundaran".to_string(),
        "merge" => "Bergabung".to_string(),
        "on ramp" => "Masuk jalan layang".to_string(),
        "off ramp" => "Keluar jalan layang".to_string(),
        "fork" => match direction {
            Some(d) => format!("Ambil jalur {}", d),
            None => "Ambil percabangan".to_string(),
        },
        "end of road" => match direction {
            Some(d) => format!("Di ujung jalan, belok {}", d),
            None => "Di ujung jalan".to_string(),
        },
        "continue" | "new name" => "Lanjutkan lurus".to_string(),
        // "turn" and anything unrecognized
        _ => match maneuver.modifier.as_deref() {
            Some("uturn") => "Putar balik".to_string(),
            Some("straight") => "Lurus".to_string(),
            Some(m) => match direction_phrase(m) {
                "" => "Belok".to_string(),
                d => format!("Belok {}", d),
            },
            None => "Lanjutkan".to_string(),
        },
    };

    if road.trim().is_empty() {
        base
    } else {
        format!("{} ke {}", base, road.trim())
    }
}

fn direction_phrase(modifier: &str) -> &'static str {
    match modifier {
        "left" => "kiri",
        "right" => "kanan",
        "slight left" => "sedikit ke kiri",
        "slight right" => "sedikit ke kanan",
        "sharp left" => "tajam ke kiri",
        "sharp right" => "tajam ke kanan",
        "uturn" => "putar balik",
        "straight" => "lurus",
        _ => "",
    }
}
