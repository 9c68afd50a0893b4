use clap::{value_parser, Arg, ArgMatches, Command};
use sweep_driver::{Driver, DriverConfig, SweepError};

fn get_args() -> ArgMatches {
    Command::new("Sweep scan reader.")
        .about("Reads scans from a Sweep LiDAR.")
        .disable_version_flag(true)
        .arg(
            Arg::new("port")
                .help("The device path to a serial port")
                .use_value_delimiter(false)
                .required(true),
        )
        .arg(
            Arg::new("bitrate")
                .long("bitrate")
                .value_parser(value_parser!(u32))
                .default_value("115200"),
        )
        .arg(
            Arg::new("motor-speed")
                .long("motor-speed")
                .help("Motor speed in Hz")
                .value_parser(value_parser!(i32))
                .default_value("5"),
        )
        .arg(
            Arg::new("scans")
                .long("scans")
                .help("Number of scans to read")
                .value_parser(value_parser!(usize))
                .default_value("10"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file"),
        )
        .get_matches()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = get_args();
    let port_name: &String = matches.get_one("port").unwrap();
    let bitrate: u32 = *matches.get_one("bitrate").unwrap();
    let motor_speed: i32 = *matches.get_one("motor-speed").unwrap();
    let n_scans: usize = *matches.get_one("scans").unwrap();
    let config = match matches.get_one::<String>("config") {
        Some(path) => DriverConfig::from_file(path)?,
        None => DriverConfig::default(),
    };

    let driver = Driver::new(config);
    let session = driver.construct(port_name, bitrate)?;
    session.set_motor_speed(motor_speed)?;
    session.start_scanning()?;

    for _ in 0..n_scans {
        match session.get_scan() {
            Ok(scan) => {
                let nearest = scan.distances_mm().min().unwrap_or(0);
                println!(
                    "{} samples, nearest {} mm, {} dropped, {} corrupted",
                    scan.len(),
                    nearest,
                    scan.dropped_samples,
                    scan.corrupted_frames
                );
            }
            Err(SweepError::Timeout) => log::warn!("No scan within the scan timeout"),
            Err(e) => {
                session.destruct();
                return Err(e.into());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&session.telemetry())?);
    session.destruct();
    Ok(())
}
