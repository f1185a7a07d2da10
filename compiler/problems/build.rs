use std::{
    env,
    error::Error,
    fs::{self, File},
    io::Write,
    path::PathBuf,
    process,
};

/// One row from the problem code registry.
struct ProblemDef {
    /// The code that users know this problem as. Codes remain stable
    /// between releases so that documentation stays valid.
    code: String,
    /// The name the compiler sources use. Names may change between
    /// releases.
    name: String,
    /// A constant message describing the problem.
    message: String,
}

fn generate_problems() -> Result<(), Box<dyn Error>> {
    // Rerun the build script when the registry changes.
    println!("cargo:rerun-if-changed=resources/problem-codes.csv");

    let mut src_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    src_path.push("resources");
    src_path.push("problem-codes.csv");

    let src = fs::read_to_string(src_path)?;

    let mut defs = vec![];
    let mut rdr = csv::Reader::from_reader(src.as_bytes());
    for result in rdr.records() {
        let record = result?;
        let field = |idx: usize| -> Result<String, String> {
            record
                .get(idx)
                .map(|v| v.to_string())
                .ok_or_else(|| format!("Record {:?} is not valid at column {}", record, idx))
        };
        defs.push(ProblemDef {
            code: field(0)?,
            name: field(1)?,
            message: field(2)?,
        });
    }

    let mut out_path = PathBuf::from(env::var("OUT_DIR")?);
    fs::create_dir_all(out_path.clone())?;
    out_path.push("problems.rs");
    let mut out = File::create(out_path)?;

    out.write_all(b"/// Problems that the compiler can detect and report.\n")?;
    out.write_all(b"#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]\n")?;
    out.write_all(b"pub enum Problem {\n")?;
    for def in &defs {
        out.write_all(format!("    {},\n", def.name).as_bytes())?;
    }
    out.write_all(b"}\n\n")?;

    out.write_all(b"impl Problem {\n")?;

    out.write_all(b"    /// Returns the stable code for the problem.\n")?;
    out.write_all(b"    pub fn code(&self) -> &'static str {\n")?;
    out.write_all(b"        match self {\n")?;
    for def in &defs {
        out.write_all(
            format!("            Problem::{} => \"{}\",\n", def.name, def.code).as_bytes(),
        )?;
    }
    out.write_all(b"        }\n    }\n\n")?;

    out.write_all(b"    /// Returns the constant message for the problem.\n")?;
    out.write_all(b"    pub fn message(&self) -> &'static str {\n")?;
    out.write_all(b"        match self {\n")?;
    for def in &defs {
        out.write_all(
            format!("            Problem::{} => \"{}\",\n", def.name, def.message).as_bytes(),
        )?;
    }
    out.write_all(b"        }\n    }\n")?;

    out.write_all(b"}\n")?;
    out.flush()?;

    Ok(())
}

fn main() {
    if let Err(err) = generate_problems() {
        println!("problem generating problems.rs: {}", err);
        process::exit(1);
    }
}
