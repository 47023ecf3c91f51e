use std::fs;
use std::path::Path;

use atlasgen_core::asset_catalog::Scale;
use atlasgen_core::pipeline::{run, Config};
use image::{imageops, Rgba, RgbaImage};
use serde_json::{json, Value};

fn sprite(seed: u8, edge: u32) -> RgbaImage {
    RgbaImage::from_fn(edge, edge, |x, y| Rgba([seed, x as u8, y as u8, 255]))
}

/// Writes `<dir>/<name>.imageset` with the given 2x and 3x sprites.
fn bundle(dir: &Path, name: &str, two: Option<&RgbaImage>, three: Option<&RgbaImage>) {
    let b = dir.join(format!("{}.imageset", name));
    fs::create_dir_all(&b).unwrap();
    let mut images = vec![json!({"idiom": "universal", "scale": "1x"})];
    for (scale, img) in [("2x", two), ("3x", three)] {
        match img {
            Some(img) => {
                let file = format!("{}@{}.png", name.to_lowercase(), scale);
                img.save(b.join(&file)).unwrap();
                images.push(json!({"idiom": "universal", "scale": scale, "filename": file}));
            }
            None => images.push(json!({"idiom": "universal", "scale": scale})),
        }
    }
    let contents = json!({"images": images, "info": {"version": 1, "author": "xcode"}});
    fs::write(b.join("Contents.json"), contents.to_string()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn catalog(root: &Path, info: Value) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("Contents.json"), json!({ "info": info }).to_string()).unwrap();
}

#[test]
fn packs_each_folder_per_scale() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("In.xcassets");
    catalog(&input, json!({"version": 1, "author": "xcode"}));

    bundle(&input, "Logo", Some(&sprite(200, 64)), Some(&sprite(201, 96)));
    let icons = input.join("Icons");
    let names = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];
    for (i, name) in names.iter().enumerate() {
        bundle(&icons, name, Some(&sprite(i as u8, 64)), None);
    }
    // mixed sizes: this group is skipped, the rest still get written
    let broken = input.join("Broken");
    bundle(&broken, "Big", Some(&sprite(50, 32)), None);
    bundle(&broken, "Small", Some(&sprite(51, 16)), None);

    let atlas_out = tmp.path().join("Out.xcassets");
    let data_out = tmp.path().join("Data.xcassets");
    fs::create_dir_all(atlas_out.join("Stale.imageset")).unwrap();

    let summary = run(&Config::new(&input, &atlas_out, &data_out)).unwrap();
    assert!(!summary.up_to_date);
    let packed: Vec<(String, Scale, usize, u32)> =
        summary.packed.iter().map(|p| (p.group.clone(), p.scale, p.images, p.edge)).collect();
    assert_eq!(
        packed,
        vec![
            ("Icons".to_string(), Scale::Two, 5, 192),
            ("Atlas".to_string(), Scale::Two, 1, 64),
            ("Atlas".to_string(), Scale::Three, 1, 96),
        ]
    );
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!((summary.skipped[0].group.as_str(), summary.skipped[0].scale), ("Broken", Scale::Two));

    // old output is gone, root descriptor copied into both roots
    assert!(!atlas_out.join("Stale.imageset").exists());
    assert_eq!(read_json(&atlas_out.join("Contents.json")), read_json(&input.join("Contents.json")));
    assert_eq!(read_json(&data_out.join("Contents.json")), read_json(&input.join("Contents.json")));
    assert!(!atlas_out.join("Broken.imageset").exists());

    let atlas = image::open(atlas_out.join("Icons.imageset/Icons@2x.png")).unwrap().to_rgba8();
    assert_eq!(atlas.dimensions(), (192, 192));

    let frames = read_json(&data_out.join("Icons@2x.dataset/Icons.json"));
    let map = frames.as_object().unwrap();
    assert_eq!(map.len(), 5);

    let mut unflipped = atlas.clone();
    imageops::flip_vertical_in_place(&mut unflipped);
    let cells = [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1)];
    for (i, name) in names.iter().enumerate() {
        let f = &map[*name];
        assert_eq!(f["size"], json!({"width": 64, "height": 64}));
        let (x, y) = (f["frame"]["x"].as_u64().unwrap() as u32, f["frame"]["y"].as_u64().unwrap() as u32);
        assert_eq!((x / 64, y / 64), cells[i]);
        assert_eq!((f["frame"]["width"].as_u64(), f["frame"]["height"].as_u64()), (Some(64), Some(64)));

        let cropped = imageops::crop_imm(&unflipped, x, y, 64, 64).to_image();
        assert_eq!(cropped.as_raw(), sprite(i as u8, 64).as_raw(), "{}", name);
    }

    let logo = read_json(&atlas_out.join("Atlas.imageset/Contents.json"));
    assert_eq!(logo["images"][1]["filename"], "Atlas@2x.png");
    assert_eq!(logo["images"][2]["filename"], "Atlas@3x.png");
    let icons_contents = read_json(&atlas_out.join("Icons.imageset/Contents.json"));
    assert!(icons_contents["images"][2].get("filename").is_none());

    let data_contents = read_json(&data_out.join("Atlas@3x.dataset/Contents.json"));
    assert_eq!(data_contents["data"][0]["filename"], "Atlas.json");
    let logo_frames = read_json(&data_out.join("Atlas@3x.dataset/Atlas.json"));
    assert_eq!(logo_frames["Logo"]["frame"], json!({"x": 0, "y": 0, "width": 96, "height": 96}));
}

#[test]
fn repeated_runs_are_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("In.xcassets");
    catalog(&input, json!({"version": 1}));
    for i in 0..3u8 {
        bundle(&input.join("Tiles"), &format!("T{}", i), Some(&sprite(i, 8)), Some(&sprite(i, 12)));
    }
    let cfg = Config::new(&input, tmp.path().join("A"), tmp.path().join("AD"));
    run(&cfg).unwrap();
    let first = fs::read(tmp.path().join("A/Tiles.imageset/Tiles@3x.png")).unwrap();
    let first_frames = fs::read(tmp.path().join("AD/Tiles@3x.dataset/Tiles.json")).unwrap();
    run(&cfg).unwrap();
    assert_eq!(fs::read(tmp.path().join("A/Tiles.imageset/Tiles@3x.png")).unwrap(), first);
    assert_eq!(fs::read(tmp.path().join("AD/Tiles@3x.dataset/Tiles.json")).unwrap(), first_frames);
}

#[test]
fn custom_version_skips_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("In.xcassets");
    catalog(&input, json!({"version": 1, "customVersion": 1}));
    bundle(&input, "Logo", Some(&sprite(1, 8)), None);

    let atlas_out = tmp.path().join("Out.xcassets");
    fs::create_dir_all(&atlas_out).unwrap();
    fs::write(atlas_out.join("keep"), "x").unwrap();

    let mut cfg = Config::new(&input, &atlas_out, tmp.path().join("Data.xcassets"));
    let summary = run(&cfg).unwrap();
    assert!(summary.up_to_date);
    assert!(atlas_out.join("keep").exists());
    assert!(!tmp.path().join("Data.xcassets").exists());

    cfg.force = true;
    let summary = run(&cfg).unwrap();
    assert_eq!(summary.packed.len(), 1);
    assert!(!atlas_out.join("keep").exists());
}

#[test]
fn oversized_group_is_skipped_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("In.xcassets");
    catalog(&input, json!({}));
    for i in 0..5u8 {
        bundle(&input.join("Many"), &format!("M{}", i), Some(&sprite(i, 8)), None);
    }
    bundle(&input, "One", Some(&sprite(9, 8)), None);

    let mut cfg = Config::new(&input, tmp.path().join("Out"), tmp.path().join("Data"));
    cfg.max_edge = 16;
    let summary = run(&cfg).unwrap();
    assert_eq!(summary.packed.len(), 1);
    assert_eq!(summary.packed[0].group, "Atlas");
    assert!(summary.skipped[0].reason.contains("too large"));
}

#[test]
fn missing_root_descriptor_is_fatal_and_keeps_old_output() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("In.xcassets");
    bundle(&input, "Logo", Some(&sprite(1, 8)), None);
    let atlas_out = tmp.path().join("Out.xcassets");
    fs::create_dir_all(&atlas_out).unwrap();
    fs::write(atlas_out.join("keep"), "x").unwrap();

    assert!(run(&Config::new(&input, &atlas_out, tmp.path().join("Data"))).is_err());
    assert!(atlas_out.join("keep").exists());
    assert!(!tmp.path().join("Data").exists());
    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.starts_with(".atlasgen-")), "{:?}", names);
}

#[test]
fn shared_output_catalog_keeps_both_bundles() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("In.xcassets");
    catalog(&input, json!({"version": 1}));
    bundle(&input, "Logo", Some(&sprite(3, 8)), None);

    let out = tmp.path().join("Out.xcassets");
    fs::create_dir_all(tmp.path().join("sub")).unwrap();
    let spellings = [out.clone(), tmp.path().join("sub/../Out.xcassets")];
    for data_out in spellings {
        let summary = run(&Config::new(&input, &out, &data_out)).unwrap();
        assert_eq!(summary.packed.len(), 1);
        assert!(out.join("Atlas.imageset/Atlas@2x.png").is_file(), "{}", data_out.display());
        assert!(out.join("Atlas@2x.dataset/Atlas.json").is_file(), "{}", data_out.display());
        assert_eq!(read_json(&out.join("Contents.json")), read_json(&input.join("Contents.json")));
    }
    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.starts_with('.')), "{:?}", names);
}
