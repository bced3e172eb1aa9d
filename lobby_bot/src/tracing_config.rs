use crate::config::*;

use std::{io::Error as IoError, path::Path};
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::{filter::filter_fn, prelude::*, registry::LookupSpan, Layer};

fn build_target<S>(
    conf: LogEntry,
    dir: impl AsRef<Path>,
) -> Result<Box<dyn Layer<S> + Send + Sync + 'static>, IoError>
where
    S: Subscriber + Send + Sync,
    for<'span> S: LookupSpan<'span>,
{
    let layer = match &conf.target {
        LogTarget::File { filename } => {
            std::fs::create_dir_all(dir.as_ref())?;
            tracing_subscriber::fmt::layer()
                .with_writer(tracing_appender::rolling::daily(dir, filename))
                .with_ansi(false)
                .boxed()
        }
        LogTarget::Builtin(BuiltinLogTarget::Stdout) => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .boxed(),
        LogTarget::Builtin(BuiltinLogTarget::Stderr) => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let filter = filter_fn(move |metadata| {
        let level: LevelFilter = conf.level.map(Into::into).unwrap_or(LevelFilter::TRACE);
        metadata.level() <= &level
            && (conf.modules.is_empty()
                || match metadata.module_path() {
                    Some(module) => conf.modules.iter().any(|m| module.starts_with(m.as_str())),
                    None => true,
                })
    });

    Ok(layer.with_filter(filter).boxed())
}

pub fn build_subscriber(conf: LoggingConfig) -> Result<impl Subscriber + Send + Sync, IoError> {
    let mut layers = Vec::new();

    for target in conf.targets {
        layers.push(build_target(target, &conf.dir)?);
    }

    // The global filter only trims noisy modules; each target applies its own
    // level on top of it
    let filter = tracing_subscriber::filter::Targets::new()
        .with_default(conf.default_level.unwrap_or(LogLevel::Trace))
        .with_targets(conf.module_levels);

    Ok(tracing_subscriber::registry().with(filter).with(layers))
}
