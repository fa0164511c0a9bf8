#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a solid-color PNG of the given size, creating parent directories
pub fn write_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().expect("png has a parent")).expect("mkdir png parent");
    RgbaImage::from_pixel(width, height, Rgba([30, 120, 200, 255]))
        .save(path)
        .expect("write png fixture");
}

/// Fixture tree:
///
/// ```text
/// root/
///   swords/{square_crossed.png, tall.png, wide.png}
///   swords_transparent/blade.png
///   swords_sources/sword.psd
///   deep_nested_assets/a/b/c/gem.png
///   empty_dir/
///   non_assets/{notes.txt, readme.md}
///   dir_with_empty_subdirs/{one/, two/three/}
/// ```
pub fn write_fixture_tree(root: &Path) -> PathBuf {
    let swords = root.join("swords");
    write_png(&swords.join("square_crossed.png"), 16, 16);
    write_png(&swords.join("tall.png"), 8, 32);
    write_png(&swords.join("wide.png"), 32, 8);

    write_png(&root.join("swords_transparent").join("blade.png"), 4, 4);
    write_png(&root.join("deep_nested_assets/a/b/c").join("gem.png"), 4, 4);

    fs::create_dir_all(root.join("swords_sources")).expect("mkdir");
    fs::write(root.join("swords_sources/sword.psd"), b"psd").expect("write psd");

    fs::create_dir_all(root.join("empty_dir")).expect("mkdir");

    fs::create_dir_all(root.join("non_assets")).expect("mkdir");
    fs::write(root.join("non_assets/notes.txt"), b"notes").expect("write txt");
    fs::write(root.join("non_assets/readme.md"), b"readme").expect("write md");

    fs::create_dir_all(root.join("dir_with_empty_subdirs/one")).expect("mkdir");
    fs::create_dir_all(root.join("dir_with_empty_subdirs/two/three")).expect("mkdir");

    swords
}
