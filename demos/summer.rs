use std::io::Write;

use cmdtree::{Arg, Command, Context, Environment, Flag, Parameters};

#[derive(Default)]
struct Summer {
    items: Vec<u32>,
    verbose: bool,
}

impl Command for Summer {
    fn setup(&mut self, params: &mut Parameters<'_, '_>) {
        self.verbose = params.flag(
            Flag::new("verbose", "Print each item before summing.")
                .short('v')
                .boolean()
                .parse::<bool>(),
        );
        self.items = params.arg_repeated(Arg::new("item", "The items to sum.").parse::<u32>());
    }

    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<(), Box<dyn std::error::Error>> {
        if self.verbose {
            for item in &self.items {
                writeln!(ctx.stdout(), "item: {item}")?;
            }
        }
        let sum: u32 = self.items.iter().sum();
        writeln!(ctx.stdout(), "Sum: {sum}")?;
        Ok(())
    }
}

fn main() {
    let result = Environment::new().run(|cmds| {
        cmds.root(Summer::default());
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
