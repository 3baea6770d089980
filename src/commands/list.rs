//! List command implementation

use eeprog_core::chip::{Features, WriteEnableMode, WriteStrobe, GEOMETRIES};

/// List all supported chips
pub fn list_chips() {
    println!("Supported chips:");
    println!();
    println!(
        "{:<10} {:<10} {:>4} {:>8} {:<10} {:<7} {}",
        "Name", "-t", "Code", "Size", "WE", "Strobe", "Features"
    );
    println!("{}", "-".repeat(72));

    for (code, geometry) in GEOMETRIES.iter().enumerate() {
        let we = match geometry.write_enable {
            WriteEnableMode::DedicatedPin => "pin",
            WriteEnableMode::SharedWithAddressLine => "shared",
        };
        let strobe = match geometry.strobe {
            WriteStrobe::WriteEnable => "WE",
            WriteStrobe::ChipEnable => "CE",
        };

        println!(
            "{:<10} {:<10} {:>4} {:>8} {:<10} {:<7} {}",
            geometry.name,
            geometry.cli_name.unwrap_or("-"),
            code,
            format_size(geometry.total_bytes),
            we,
            strobe,
            feature_names(geometry.features)
        );
    }
}

fn feature_names(features: Features) -> String {
    let names: Vec<&str> = features.iter_names().map(|(name, _)| name).collect();
    names.join(",")
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
