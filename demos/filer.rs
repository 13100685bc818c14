use std::io::{Read, Write};

use cmdtree::{Arg, Command, Context, Environment, Flag, Parameters};

#[derive(Default)]
struct Copy {
    source: String,
    destination: String,
    force: bool,
}

impl Command for Copy {
    fn setup(&mut self, params: &mut Parameters<'_, '_>) {
        self.force = params.flag(
            Flag::new("force", "Overwrite the destination if it exists.")
                .short('f')
                .boolean()
                .parse::<bool>(),
        );
        self.source = params.arg(Arg::new("source", "The file to copy."));
        self.destination = params.arg(Arg::new("destination", "Where to copy it."));
    }

    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
        writeln!(
            ctx.stdout(),
            "copy {} -> {} (force: {})",
            self.source,
            self.destination,
            self.force
        )?;
        Ok(())
    }
}

#[derive(Default)]
struct List {
    depth: u32,
    paths: Vec<String>,
}

impl Command for List {
    fn setup(&mut self, params: &mut Parameters<'_, '_>) {
        self.depth = params.flag(
            Flag::new("depth", "How many directory levels to descend.")
                .short('d')
                .env("FILER_DEPTH")
                .parse::<u32>()
                .default(1),
        );
        self.paths = params.arg_repeated(Arg::new("path", "The directories to list."));
    }

    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
        writeln!(ctx.stdout(), "list (depth {}): {:?}", self.depth, self.paths)?;
        Ok(())
    }
}

#[derive(Default)]
struct Ingest;

impl Command for Ingest {
    fn setup(&mut self, _params: &mut Parameters<'_, '_>) {}

    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
        let mut input = String::new();
        ctx.stdin().read_to_string(&mut input)?;
        writeln!(ctx.stdout(), "ingested {} bytes", input.len())?;
        Ok(())
    }
}

fn main() {
    let result = Environment::new().run(|cmds| {
        cmds.group("files", "Commands related to files", |cmds| {
            cmds.command(
                "copy",
                "Copy a file\n\n            Copies source to destination without touching source.",
                Copy::default(),
            );
            cmds.command("list", "List some files", List::default());
        });
        cmds.command("ingest", "Read stdin and report its size", Ingest::default());
    });

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}
