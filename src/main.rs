use std::{fs, fs::File, io::BufWriter, process::ExitCode};

use eps::{CanvasContext, Interpreter, PostScriptResult};

/// Page size used when the document carries no BoundingBox, in points
const DEFAULT_WIDTH: usize = 612;
const DEFAULT_HEIGHT: usize = 792;

fn render(input: &str, output: &str) -> PostScriptResult<()> {
    let source = fs::read(input)?;

    let mut interpreter = Interpreter::load(&source)?;

    let bounding_box = interpreter.metadata().bounding_box;

    let (width, height) = match bounding_box {
        Some(bbox) => (
            bbox.width().ceil().max(1.0) as usize,
            bbox.height().ceil().max(1.0) as usize,
        ),
        None => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
    };

    let mut ctx = CanvasContext::new(width, height, bounding_box);

    interpreter.run(&mut ctx)?;

    let file = File::create(output)?;
    ctx.canvas().write_png(BufWriter::new(file))?;

    log::info!("wrote {}x{} px to {}", width, height, output);

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);

    let input = match args.next() {
        Some(input) => input,
        None => {
            eprintln!("usage: eps <input.eps> [output.png]");
            return ExitCode::FAILURE;
        }
    };

    let output = args.next().unwrap_or_else(|| "out.png".to_owned());

    match render(&input, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
