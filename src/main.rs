use clap::{arg,crate_version,Command};
use rolz78::{parse_size,CompressEngine,DecompressEngine,EngineConfig,Error,Progress,STD_CONFIG};
use std::fs::File;
use std::io::{BufReader,BufWriter};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(),Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help =
"Examples:
---------
Compress:      `rolz78 compress -i plain.txt -o plain.lz78`
Expand:        `rolz78 expand -i plain.lz78 -o plain.txt`";

    let mut main_cmd = Command::new("rolz78")
        .about("Streaming LZ78 compression with dual-dictionary rotation")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-s --size [SIZE] "dictionary size, accepts K/M suffix").required(false))
        .about("compress a file"));
    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let d_size = match cmd.get_one::<String>("size") {
            Some(s) => parse_size(s),
            None => STD_CONFIG.d_size
        };
        log::debug!("compressing {} -> {} with requested dictionary size {}",path_in,path_out,d_size);
        let mut src = BufReader::new(File::open(path_in)?);
        let mut dst = BufWriter::new(File::create(path_out)?);
        let cfg = EngineConfig { d_size,..STD_CONFIG };
        let mut engine = CompressEngine::new(cfg)?;
        run_until_done(|| engine.step(&mut src,&mut dst))?;
        run_until_done(|| engine.close(&mut dst).map(|_| Progress::Done))?;
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        log::debug!("expanding {} -> {}",path_in,path_out);
        let mut src = BufReader::new(File::open(path_in)?);
        let mut dst = BufWriter::new(File::create(path_out)?);
        let mut engine = DecompressEngine::new()?;
        run_until_done(|| engine.step(&mut src,&mut dst))?;
        run_until_done(|| engine.close().map(|_| Progress::Done))?;
    }

    Ok(())
}

/// The one piece of glue the core explicitly leaves to its caller: retry on
/// `Progress::Again`/`Error::Again` until the operation is actually done.
fn run_until_done<F>(mut step: F) -> Result<(),Box<dyn std::error::Error>>
where F: FnMut() -> Result<Progress,Error> {
    loop {
        match step() {
            Ok(Progress::Done) => return Ok(()),
            Ok(Progress::Again) => continue,
            Err(Error::Again) => continue,
            Err(e) => return Err(Box::new(e))
        }
    }
}
