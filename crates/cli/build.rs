use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("pagedown")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert web pages into clean Markdown")
        .arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--json "Print the result and metadata as JSON"))
        .arg(clap::arg!(--"no-metadata" "Omit the title and metadata header"))
        .arg(
            clap::arg!(--"heading-style" <STYLE> "Heading style")
                .default_value("atx")
                .value_parser(["atx", "setext"]),
        )
        .arg(
            clap::arg!(--bullet <MARKER> "Bullet list marker")
                .default_value("-")
                .value_parser(["-", "*", "+"]),
        )
        .arg(
            clap::arg!(--"code-style" <STYLE> "Code block style")
                .default_value("fenced")
                .value_parser(["fenced", "indented"]),
        )
        .arg(
            clap::arg!(--"em-delimiter" <DELIM> "Emphasis delimiter")
                .default_value("*")
                .value_parser(["*", "_"]),
        )
        .arg(
            clap::arg!(--"strong-delimiter" <DELIM> "Strong delimiter")
                .default_value("**")
                .value_parser(["**", "__"]),
        )
        .arg(clap::arg!(--timeout <MS> "HTTP timeout in milliseconds").default_value("30000"))
        .arg(clap::arg!(--"max-bytes" <BYTES> "Maximum response size in bytes").default_value("10485760"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(
            clap::arg!(--"char-threshold" <NUM> "Text length an extraction attempt must reach to be accepted")
                .default_value("500"),
        )
        .arg(clap::arg!(--"keep-classes" "Keep all class attributes when cleaning content"))
        .arg(clap::arg!(-v --verbose "Show progress and enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "pagedown", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "pagedown", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "pagedown", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "pagedown", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
