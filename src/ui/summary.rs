use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::environment::health::{HealthOutcome, HealthReport};
use crate::proxy::RouteTable;

/// Local URL of a route through the proxy.
pub fn local_url(proxy_port: u16, handle: &str) -> String {
    format!("http://localhost:{}{}", proxy_port, handle)
}

pub fn route_table(routes: &RouteTable, proxy_port: u16, health: Option<&HealthReport>) -> Table {
    let use_color = std::io::stdout().is_terminal();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Service").set_alignment(CellAlignment::Left),
        Cell::new("URL").set_alignment(CellAlignment::Left),
        Cell::new("Status").set_alignment(CellAlignment::Center),
    ]);

    for route in routes.routes() {
        let status = match health.and_then(|h| h.outcomes.get(&route.service)) {
            Some(HealthOutcome::Healthy { .. }) => "healthy",
            Some(HealthOutcome::Unhealthy { .. }) => "unhealthy",
            Some(HealthOutcome::Cancelled) => "cancelled",
            None => "running",
        };
        let status_text = if use_color {
            match status {
                "healthy" | "running" => format!("{} {}", "\u{25cf}".green(), status.green()),
                "unhealthy" => format!("{} {}", "\u{25cf}".red(), status.red()),
                other => format!("{} {}", "\u{25cf}".yellow(), other.yellow()),
            }
        } else {
            format!("\u{25cf} {}", status)
        };

        table.add_row(vec![
            Cell::new(&route.service),
            Cell::new(local_url(proxy_port, &route.handle)),
            Cell::new(&status_text),
        ]);
    }
    table
}

pub fn print_routes(name: &str, routes: &RouteTable, proxy_port: u16, health: Option<&HealthReport>) {
    let use_color = std::io::stdout().is_terminal();

    println!();
    if use_color {
        println!("  {} {}", "devhost".bold(), name.cyan());
    } else {
        println!("  devhost {}", name);
    }
    println!();

    if routes.is_empty() {
        println!("  No proxied services.");
    } else {
        // Indent the table by 2 spaces
        for line in route_table(routes, proxy_port, health).to_string().lines() {
            println!("  {}", line);
        }
    }

    println!();
    if use_color {
        println!("  Press {} to stop", "Ctrl+C".bold());
    } else {
        println!("  Press Ctrl+C to stop");
    }
    println!();
}
