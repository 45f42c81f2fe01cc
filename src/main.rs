mod benchmark;

use benchmark::run_benchmarks;

fn main() {
    env_logger::init();
    run_benchmarks();
}
