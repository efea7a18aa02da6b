#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    Help,
    Ln(Vec<&'a str>),
    Log(Vec<&'a str>),
    Version,
    Greet(Option<&'a str>),
    Raw(Vec<&'a str>),
}

pub const HELP: &str = "available commands: :ln, :log, :ver, :greet";

pub fn parse(text: &str) -> Option<Command<'_>> {
    let body = text.strip_prefix(':')?;
    let (name, argline) = body.split_once(' ').unwrap_or((body, ""));
    let args: Vec<&str> = argline.split_whitespace().collect();
    let cmd = match name {
        "logbot" => Command::Help,
        "ln" => Command::Ln(args),
        "log" => Command::Log(args),
        "ver" => Command::Version,
        "greet" => Command::Greet(args.first().copied()),
        "##" => Command::Raw(args),
        _ => return None,
    };
    Some(cmd)
}

pub fn ln(args: &[&str]) -> Option<String> {
    if args.len() != 1 {
        return Some(arity("ln", 1, args.len()));
    }
    let x: f64 = args[0].parse().ok()?;
    Some(format_float(x.ln()))
}

pub fn log(args: &[&str]) -> Option<String> {
    if args.len() != 2 {
        return Some(arity("log", 2, args.len()));
    }
    let x: f64 = args[0].parse().ok()?;
    let b: f64 = args[1].parse().ok()?;
    Some(format_float(x.ln() / b.ln()))
}

pub fn version() -> String {
    format!("running on {}", std::env::consts::OS)
}

fn arity(name: &str, expected: usize, given: usize) -> String {
    let plural = if expected == 1 { "argument" } else { "arguments" };
    format!(":{name} expected {expected} {plural}, but given {given} arguments")
}

fn format_float(v: f64) -> String {
    format!("{v:.32}")
}
