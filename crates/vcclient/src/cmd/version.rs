use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("vcclient {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: vcclient");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("commands: {}", vcclient_decode::COMMANDS.len());
    println!(
        "json_min_version: {}",
        vcclient_session::ConnectionConfig::default()
            .json_min_version
            .map(|part| part.to_string())
            .join(".")
    );

    Ok(SUCCESS)
}
