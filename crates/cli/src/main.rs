//! Driver binary. Ported from `zusi2to3.py`: convert the track module named
//! by the first argument, then convert every timetable named by the
//! remaining arguments against the route it just produced.

use std::path::PathBuf;
use std::process::ExitCode;

use util::ZusiPaths;

fn main() -> ExitCode {
    env_logger::init();

    let paths = match ZusiPaths::from_env() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("zusi2to3: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut args = std::env::args_os().skip(1);
    let str_path = match args.next() {
        Some(arg) => PathBuf::from(arg),
        None => {
            eprintln!("usage: zusi2to3 <file.str> [file.fpn ...]");
            return ExitCode::FAILURE;
        }
    };

    let (st3_name, rekursionstiefe) = match strecke::convert_route(&paths, &str_path) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("zusi2to3: converting {}: {e}", str_path.display());
            return ExitCode::FAILURE;
        }
    };

    for fpn_arg in args {
        let fpn_path = PathBuf::from(fpn_arg);
        if let Err(e) = fahrplan::convert_timetable(&paths, &fpn_path, &st3_name, rekursionstiefe) {
            eprintln!("zusi2to3: converting {}: {e}", fpn_path.display());
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
