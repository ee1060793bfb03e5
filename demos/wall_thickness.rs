use dimsolve::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let registry = initialize_registry(standard_catalog())?;

    // Minimum wall thickness of a pipe with a 12.5 % mill undertolerance.
    let mut problem = Problem::new("pipe wall", registry);
    let t_bar = problem.known("T_bar", 0.147, StandardUnit::Inch)?;
    let u_m = problem.known("U_m", 12.5, StandardUnit::Percent)?;
    let t = problem.unknown("T", StandardUnit::Inch)?;
    problem.add_equation("T", &t, &t_bar * (1.0 - &u_m))?;

    let summary = problem.solve()?.clone();
    for step in problem.steps() {
        println!("{}  ->  {step}", step.substituted.join("; "));
    }
    println!(
        "T = {:.6} in = {:.8} m ({} closed form, {} numeric)",
        problem.value_in("T", StandardUnit::Inch)?,
        problem.value_in("T", StandardUnit::Meter)?,
        summary.closed_form,
        summary.numeric,
    );
    println!("{}", problem.state());
    Ok(())
}
