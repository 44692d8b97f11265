use std::path::PathBuf;

use common::logging::{Logger, LoggerBuilder};
use common::*;
use config::{Config, ConfigType};
use resources::Shaders;

use crate::check::{check, discover, CheckOptions};
use crate::context::HiddenContext;

mod check;
mod context;

/// Compiles, links and validates GLSL programs, printing the driver's logs
#[derive(argh::FromArgs)]
struct Args {
    /// directory of `<name>.<stage>` shader files, defaults to the configured shader root
    #[argh(option, short = 'd')]
    dir: Option<PathBuf>,

    /// ron config file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// log level, overrides GLO_LOG
    #[argh(option, short = 'l')]
    log_level: Option<String>,

    /// skip glValidateProgram after linking
    #[argh(switch)]
    no_validate: bool,

    /// print the active uniforms of each linked program
    #[argh(switch, short = 'u')]
    uniforms: bool,

    /// programs to check, e.g. `sky` for sky.vert and sky.frag. Defaults to all in the directory
    #[argh(positional)]
    names: Vec<String>,
}

fn init_logger(level: Option<&str>) -> BoxedResult<Logger> {
    let mut builder = LoggerBuilder::with_env()?;
    if let Some(level) = level {
        builder = builder.level_str(level)?;
    }

    // keep log lines in order with the reports on stdout
    Ok(builder.synchronous().init()?)
}

/// Ok(false) if any program failed
fn do_main(args: Args) -> BoxedResult<bool> {
    let config = match &args.config {
        Some(path) => config::load(ConfigType::File(path))?,
        None => Config::default(),
    };

    let dir = args.dir.unwrap_or_else(|| config.shaders.root_dir.clone());
    let shaders = Shaders::standalone(&dir)?;

    let names = if args.names.is_empty() {
        discover(&shaders)
    } else {
        args.names
    };

    if names.is_empty() {
        warn!("no shaders found"; "dir" => %dir.display());
        return Ok(true);
    }

    let context = HiddenContext::new(&config.gl)?;
    let opts = CheckOptions {
        validate: !args.no_validate,
        uniforms: args.uniforms,
    };

    let mut failed = 0;
    for name in &names {
        let report = check(context.gl(), &shaders, name, opts);
        if !report.passed() {
            failed += 1;
        }
        print!("{}", report);
    }

    info!("checked programs"; "total" => names.len(), "failed" => failed);
    Ok(failed == 0)
}

fn main() {
    let args = argh::from_env::<Args>();
    let logger = match init_logger(args.log_level.as_deref()) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("failed to initialise logging: {}", e);
            std::process::exit(2);
        }
    };

    let exit = match do_main(args) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("error: {}", e);

            let mut src = e.source();
            while let Some(source) = src {
                error!(" caused by: {}", source);
                src = source.source();
            }

            2
        }
    };

    debug!("exiting"; "code" => exit);
    drop(logger);
    std::process::exit(exit);
}
