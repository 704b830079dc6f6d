use clap::{App, Arg, SubCommand};
use icoextract::{
    Extractor, PeFile, DEFAULT_DOWNSCALE_THRESHOLD, DEFAULT_UPSCALE_THRESHOLD,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

//===========================================================================//

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new("exeicontool")
        .version("0.1")
        .about("Extracts icons from Windows executables")
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists the usable icons of an executable, best first")
                .arg(Arg::with_name("file").required(true)),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Saves every usable icon as an ICO or PNG file")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("DIR")
                        .short("o")
                        .long("output")
                        .help("Sets output directory"),
                )
                .arg(Arg::with_name("file").required(true)),
        )
        .subcommand(
            SubCommand::with_name("best")
                .about("Renders the icon closest to a width as a PNG file")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(Arg::with_name("file").required(true))
                .arg(Arg::with_name("width").required(true)),
        )
        .get_matches();
    let extractor = Extractor::new(PeFile);
    if let Some(submatches) = matches.subcommand_matches("list") {
        let path = Path::new(submatches.value_of("file").unwrap());
        let icons = match extractor.find_icons(path) {
            Some(icons) => icons,
            None => {
                eprintln!("Could not open {:?}", path);
                std::process::exit(1);
            }
        };
        for (index, icon) in icons.iter().enumerate() {
            let entry = icon.entry();
            let kind = if icon.is_png() { "PNG" } else { "BMP" };
            println!(
                "{:5}: {}x{} {}, {} bpp, id {}, {} bytes",
                index,
                entry.width,
                entry.height,
                kind,
                entry.bit_count,
                entry.id,
                icon.data().len()
            );
        }
    } else if let Some(submatches) = matches.subcommand_matches("extract") {
        let path = Path::new(submatches.value_of("file").unwrap());
        let out_dir = PathBuf::from(submatches.value_of("output").unwrap_or("."));
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "icon".to_string());
        let icons = extractor.find_icons(path).unwrap_or_default();
        fs::create_dir_all(&out_dir).unwrap();
        for (index, icon) in icons.iter().enumerate() {
            let out_path = out_dir.join(format!(
                "{}.{}.{}",
                stem,
                index,
                icon.file_extension()
            ));
            println!("Writing {:?}", out_path);
            fs::write(&out_path, icon.to_bytes().unwrap()).unwrap();
        }
    } else if let Some(submatches) = matches.subcommand_matches("best") {
        let path = Path::new(submatches.value_of("file").unwrap());
        let width = submatches.value_of("width").unwrap();
        let width = width.parse::<u32>().unwrap();
        let image = match extractor.get_best_icon(
            path,
            width,
            DEFAULT_DOWNSCALE_THRESHOLD,
            DEFAULT_UPSCALE_THRESHOLD,
        ) {
            Some(image) => image,
            None => {
                eprintln!("No icon found for {:?}", path);
                std::process::exit(1);
            }
        };
        let out_path = if let Some(out) = submatches.value_of("output") {
            PathBuf::from(out)
        } else {
            PathBuf::from(format!("{}.{}.png", path.display(), width))
        };
        let out_file = fs::File::create(out_path).unwrap();
        image.write_png(out_file).unwrap();
    }
}

//===========================================================================//
