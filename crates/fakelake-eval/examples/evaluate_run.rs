use std::env;
use std::path::PathBuf;

use fakelake_eval::{EvaluateOptions, EvaluationEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut base_dir: Option<PathBuf> = None;
    let mut options = EvaluateOptions {
        strict: false,
        ..EvaluateOptions::default()
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--strict" => options.strict = true,
            "--violations" => options.write_violations = true,
            "--out" => options.out_dir = args.next().map(PathBuf::from),
            _ => {
                if base_dir.is_none() {
                    base_dir = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let base_dir = base_dir.ok_or("missing dataset directory")?;
    let result = EvaluationEngine::new(options).run(&base_dir)?;

    println!("metrics_path={}", result.metrics_path.display());
    println!("report_path={}", result.report_path.display());
    if let Some(path) = result.violations_path {
        println!("violations_path={}", path.display());
    }
    Ok(())
}
