use std::process::ExitCode;

use pipkit_cli::App;
use pipkit_config::Environment;
use pipkit_core::ExitStatus;

fn main() -> ExitCode {
    let app = App::new();

    let cancel = app.cancel_flag();
    let handler = ctrlc::set_handler(move || {
        // A second interrupt aborts without waiting for the command.
        if cancel.cancel() {
            std::process::exit(ExitStatus::Error.code());
        }
    });
    if let Err(err) = handler {
        eprintln!("pipkit: warning: cannot install interrupt handler: {err}");
    }

    let argv: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let env = Environment::from_process();

    app.run(&argv, &env).status.into()
}
