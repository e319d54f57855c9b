mod device;

use clap::{Arg, Command};
use device::BlockFile;
use fat32_volume::api;
use fat32_volume::volume::mount;

use std::fs::OpenOptions;
use std::sync::Arc;

const SECTOR_SIZE: usize = 512;

fn main() {
    if let Err(e) = run() {
        eprintln!("🦀 {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let matches = Command::new("fat32-volume-demo")
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .required(true)
                .help("🦀 Path to a FAT32 disk image"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .default_value("/")
                .help("🦀 Directory to list, or a file to print"),
        )
        .get_matches();

    let image_path = matches.get_one::<String>("image").unwrap();
    let target = matches.get_one::<String>("path").unwrap();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(image_path)
        .map_err(|e| format!("opening {}: {}", image_path, e))?;
    let device = Arc::new(BlockFile::new(file, SECTOR_SIZE));

    let letter = mount(device, SECTOR_SIZE).map_err(|e| format!("mount failed: {:?}", e))?;
    println!("🦀 mounted as {}:", letter);

    let full_path = format!("{}:{}", letter, target);

    if let Ok(mut dir) = api::dir_open(&full_path) {
        loop {
            match api::dir_read(&mut dir) {
                Ok(child) => {
                    let marker = if child.is_dir() { "/" } else { "" };
                    println!("{}{}", child.name, marker);
                }
                Err(fat32_volume::FatStatus::Eof) => break,
                Err(e) => return Err(format!("reading {}: {:?}", target, e)),
            }
        }
        api::dir_close(dir);
    } else {
        let mut handle = api::file_open(&full_path).map_err(|e| format!("opening {}: {:?}", target, e))?;
        let mut buf = vec![0u8; handle.file_size() as usize];
        api::file_read(&mut handle, &mut buf).map_err(|e| format!("{:?}", e))?;
        std::io::Write::write_all(&mut std::io::stdout(), &buf).ok();
        api::file_close(handle);
    }

    Ok(())
}
