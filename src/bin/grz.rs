//! grz – CLI for the grz grayscale image codec.
//!
//! ```text
//! grz -c -i image.raw -o image.grz -w 512       compress
//! grz -c -i image.raw -o image.grz -w 512 -m -a compress, differenced, adaptive scan
//! grz -d -i image.grz -o image.raw              decompress
//! ```

use std::env;
use std::fs;
use std::process::{self, ExitCode};

use grz::pipeline::{self, CompressOptions};

fn usage() {
    eprintln!("grz - lossless compression for raw 8-bit grayscale images");
    eprintln!();
    eprintln!("Usage: grz -c -i image.raw -o image.grz -w WIDTH [-m] [-a] [-v]");
    eprintln!("       grz -d -i image.grz -o image.raw [-v]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c         Compress a raw grayscale image");
    eprintln!("  -d         Decompress a grz stream");
    eprintln!("  -i PATH    Input file");
    eprintln!("  -o PATH    Output file");
    eprintln!("  -w N       Image width in pixels (required with -c, N >= 1)");
    eprintln!("  -m         Difference neighboring pixels before encoding");
    eprintln!("  -a         Pick the cheaper of row-major and column-major scanning");
    eprintln!("  -v         Report sizes and compression ratio");
    eprintln!("  -h         Show this help");
    eprintln!();
    eprintln!("The image height is inferred from the file size, which must be");
    eprintln!("a multiple of the width.");
}

#[derive(Debug, Default)]
struct Opts {
    compress: bool,
    decompress: bool,
    input: Option<String>,
    output: Option<String>,
    width: u64,
    model: bool,
    adaptive: bool,
    verbose: bool,
}

fn parse_args() -> Opts {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut opts = Opts::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-c" => opts.compress = true,
            "-d" => opts.decompress = true,
            "-m" => opts.model = true,
            "-a" => opts.adaptive = true,
            "-v" => opts.verbose = true,
            "-h" => {
                usage();
                process::exit(0);
            }
            "-i" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("grz: missing argument for -i");
                    process::exit(1);
                }
                opts.input = Some(args[i].clone());
            }
            "-o" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("grz: missing argument for -o");
                    process::exit(1);
                }
                opts.output = Some(args[i].clone());
            }
            "-w" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("grz: missing argument for -w");
                    process::exit(1);
                }
                opts.width = match args[i].parse::<u64>() {
                    Ok(n) => n,
                    Err(_) => {
                        eprintln!("grz: invalid width '{}'", args[i]);
                        process::exit(1);
                    }
                };
            }
            other => {
                eprintln!("grz: unexpected argument '{other}' (see -h)");
                process::exit(1);
            }
        }
        i += 1;
    }

    opts
}

fn process_compress(opts: &Opts, input: &str, output: &str) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("{input}: {e}"))?;
    if data.is_empty() {
        return Err(format!("{input}: file is empty"));
    }
    if data.len() as u64 % opts.width != 0 {
        return Err(format!(
            "{input}: file size {} is not a multiple of width {}",
            data.len(),
            opts.width
        ));
    }

    let options = CompressOptions {
        model: opts.model,
        adaptive: opts.adaptive,
    };
    let compressed =
        pipeline::compress(&data, opts.width, &options).map_err(|e| format!("{input}: {e}"))?;
    fs::write(output, &compressed).map_err(|e| format!("{output}: {e}"))?;

    if opts.verbose {
        let ratio = (compressed.len() as f64 / data.len() as f64) * 100.0;
        eprintln!(
            "{input}: {ratio:.1}% ({} → {} bytes)",
            data.len(),
            compressed.len()
        );
    }

    Ok(())
}

fn process_decompress(opts: &Opts, input: &str, output: &str) -> Result<(), String> {
    let data = fs::read(input).map_err(|e| format!("{input}: {e}"))?;
    let pixels = pipeline::decompress(&data).map_err(|e| format!("{input}: {e}"))?;
    fs::write(output, &pixels).map_err(|e| format!("{output}: {e}"))?;

    if opts.verbose {
        eprintln!("{input}: {} → {} bytes", data.len(), pixels.len());
    }

    Ok(())
}

fn run() -> Result<(), String> {
    let opts = parse_args();

    if opts.compress == opts.decompress {
        return Err("exactly one of -c and -d is required (see -h)".to_string());
    }
    let input = opts
        .input
        .clone()
        .ok_or_else(|| "input file is required (-i)".to_string())?;
    let output = opts
        .output
        .clone()
        .ok_or_else(|| "output file is required (-o)".to_string())?;
    if opts.compress && opts.width == 0 {
        return Err("image width is required with -c (-w, at least 1)".to_string());
    }

    if opts.compress {
        process_compress(&opts, &input, &output)
    } else {
        process_decompress(&opts, &input, &output)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("grz: {e}");
            ExitCode::FAILURE
        }
    }
}
