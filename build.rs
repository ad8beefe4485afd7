extern crate image;
use std::{env, fs};
use std::path::PathBuf;
use image::{Rgba, RgbaImage};

const ICON_SIZE: u32 = 32;

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>com.dialog-semiconductor.dlg-cap-link</string>
    <key>CFBundleName</key>
    <string>DLG-CAP Link</string>
    <key>CFBundleShortVersionString</key>
    <string>{version}</string>
    <key>NSBluetoothAlwaysUsageDescription</key>
    <string>DLG-CAP Link connects to the DLG-CAP pressure sensor over Bluetooth.</string>
</dict>
</plist>
"#;

fn out_dir() -> String {
    env::var("OUT_DIR").expect("No OUT_DIR env var")
}

// a filled disc inside a ring, like the sensor view
fn build_window_icon() {
    let out_path: PathBuf = [out_dir().as_str(), "icon-32-rgba"].iter().collect();
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;

    let img = RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let distance = ((x as f32 - center).powi(2) + (y as f32 - center).powi(2)).sqrt();

        if distance <= 9.0 {
            Rgba([28, 115, 204, 255])
        } else if distance <= 15.5 {
            Rgba([219, 224, 232, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });

    println!("DEBUG: writing window icon to {}", out_path.to_str().unwrap());
    fs::write(&out_path, img.into_raw()).expect("Failed to write icon-32-rgba");
}

fn build_info_plist() {
    let out_path: PathBuf = [out_dir().as_str(), "Info.plist"].iter().collect();
    let version = env::var("CARGO_PKG_VERSION").expect("No CARGO_PKG_VERSION env var");

    fs::write(&out_path, INFO_PLIST.replace("{version}", &version)).expect("Failed to write Info.plist");
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    build_window_icon();
    build_info_plist();
}
