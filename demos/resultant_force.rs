use dimsolve::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let registry = initialize_registry(standard_catalog())?;
    let deg = |value: f64| Quantity::with_unit(&registry, StandardUnit::Degree, value);

    // Two forces: 450 N at 60° and 700 N at 195°, measured from +x.
    let mut triangle = Problem::new("resultant (triangle)", registry.clone());
    let f1 = triangle.known("F_1", 450.0, StandardUnit::Newton)?;
    let f2 = triangle.known("F_2", 700.0, StandardUnit::Newton)?;
    let f_r = triangle.unknown("F_R", StandardUnit::Newton)?;
    let theta = triangle.unknown("theta", StandardUnit::Degree)?;
    let gap = deg(45.0)?;
    triangle.add_equation(
        "magnitude",
        &f_r,
        sqrt(f1.powf(2.0) + f2.powf(2.0) - 2.0 * &f1 * &f2 * cos(&gap)),
    )?;
    triangle.add_equation(
        "direction",
        &f1 * sin(&gap),
        &f_r * sin(Expression::from(deg(195.0)?) - &theta),
    )?;
    triangle.solve()?;
    report(&triangle);

    // Same resultant from its x and y components; both unknowns appear in
    // both equations, so they are solved together.
    let mut components = Problem::new("resultant (components)", registry.clone());
    let f1 = components.known("F_1", 450.0, StandardUnit::Newton)?;
    let f2 = components.known("F_2", 700.0, StandardUnit::Newton)?;
    let f_r = components.add_variable(
        Variable::unknown("F_R", registry.unit(StandardUnit::Newton)?).with_guess(500.0),
    )?;
    let theta = components.add_variable(
        Variable::unknown("theta", registry.unit(StandardUnit::Degree)?).with_guess(150.0),
    )?;
    let (a1, a2) = (deg(60.0)?, deg(195.0)?);
    components.add_equation("x", &f_r * cos(&theta), &f1 * cos(&a1) + &f2 * cos(&a2))?;
    components.add_equation("y", &f_r * sin(&theta), &f1 * sin(&a1) + &f2 * sin(&a2))?;
    components.solve()?;
    report(&components);

    let kip = components.quantity("F_R")?.to_unit(&registry, StandardUnit::Kip)?;
    println!("F_R = {kip:.4}");
    Ok(())
}

fn report(problem: &Problem) {
    println!("{}", problem.name());
    for step in problem.steps() {
        for line in &step.substituted {
            println!("  {line}");
        }
        println!("  -> {step}");
    }
    for variable in problem.variables() {
        println!("  {variable}");
    }
}
