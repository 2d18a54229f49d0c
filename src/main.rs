use std::{fs, path::Path, process::ExitCode, str::FromStr};

use quire::{
    application::{
        editor::{ComponentManager, ComponentRecord, OutputField},
        error::{AppError, ErrorReport},
    },
    config::{self, Command, EditorSettings, InspectArgs},
    domain::components::ComponentKind,
    infra::{error::InfraError, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_application_error(&error);
            ExitCode::from(error.exit_code())
        }
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("quire", error);
    if dispatcher::has_been_set() {
        error!(error = %report, "application error");
    } else {
        let subscriber = tracing_fmt()
            .with_max_level(Level::ERROR)
            .with_writer(std::io::stderr)
            .finish();
        let dispatch = Dispatch::new(subscriber);
        dispatcher::with_default(&dispatch, || {
            error!(error = %report, "application error");
        });
    }
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Inspect(args) => run_inspect(&args, settings.editor),
        Command::Export(args) => run_export(&args.file, settings.editor),
    }
}

#[derive(Serialize)]
struct InspectReport<'a> {
    components: Vec<&'a ComponentRecord>,
    content: String,
}

fn run_inspect(args: &InspectArgs, settings: EditorSettings) -> Result<(), AppError> {
    let kind = args
        .kind
        .as_deref()
        .map(ComponentKind::from_str)
        .transpose()?;
    let manager = open_session(&args.file, settings)?;
    let report = InspectReport {
        components: match kind {
            Some(kind) => manager.get_all_by_type(kind),
            None => manager.get_all(),
        },
        content: manager.content(),
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn run_export(file: &Path, settings: EditorSettings) -> Result<(), AppError> {
    let manager = open_session(file, settings)?;
    println!("{}", manager.export_markup()?);
    Ok(())
}

fn open_session(file: &Path, settings: EditorSettings) -> Result<ComponentManager, AppError> {
    let markup = fs::read_to_string(file).map_err(|source| InfraError::read(file, source))?;
    let manager = ComponentManager::new_session(&markup, OutputField::new(), settings)?;
    info!(
        file = %file.display(),
        components = manager.len(),
        "markup loaded"
    );
    Ok(manager)
}
