use anyhow::Result;
use hydrosite::layers::catalog;

pub fn run() -> Result<()> {
    println!(
        "{:<22} {:<26} {:>8} {:>10} {:>10}",
        "ID", "NAME", "SCALE", "LEGEND MIN", "LEGEND MAX"
    );

    for definition in catalog() {
        println!(
            "{:<22} {:<26} {:>7}m {:>10} {:>10}",
            definition.id.as_str(),
            definition.name,
            definition.scale,
            definition.legend_min,
            definition.legend_max,
        );
    }

    Ok(())
}
