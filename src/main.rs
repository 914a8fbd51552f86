use influxdb_output::cli::{self, Opts};

fn main() {
    let opts = Opts::get_matches();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("influxdb-output-worker")
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Unable to create async runtime: {}", error);
            std::process::exit(exitcode::OSERR);
        }
    };

    let code = runtime.block_on(cli::run(opts));
    std::process::exit(code);
}
