//! End-of-run execution report, printed to stdout separately from the
//! structured logs.

use mtdeal_engine::ResultTracker;

const RULE: &str = "================================================================";

/// Print the execution summary: totals, per-client breakdown, and the
/// request-id to deal-ticket mapping for successful trades.
pub fn print_summary(tracker: &ResultTracker) {
    let stats = tracker.stats();

    println!();
    println!("{RULE}");
    println!("                    EXECUTION SUMMARY");
    println!("{RULE}");
    println!("  Total Requests:   {}", stats.total_requests);
    println!("  Successful:       {}", stats.successful);
    println!("  Rejected:         {}", stats.rejected);
    println!("  Errors:           {}", stats.errors);
    println!("  Duplicates:       {}", stats.duplicates);
    println!("  Success Rate:     {:.1}%", stats.success_rate());
    println!("{RULE}");

    println!("\n  Per-Client Breakdown:");
    println!(
        "  {:<12}{:<8}{:<8}{:<8}{:<8}",
        "Client", "Total", "OK", "Fail", "Dup"
    );
    println!("  {}", "-".repeat(44));
    for client_id in tracker.client_ids() {
        let client = tracker.client_stats(&client_id);
        println!(
            "  {:<12}{:<8}{:<8}{:<8}{:<8}",
            client_id,
            client.total_requests,
            client.successful,
            client.rejected + client.errors,
            client.duplicates
        );
    }

    println!("\n  Request ID -> MT Ticket Mapping (successful trades):");
    println!("  {:<22}{:<12}Price", "Request ID", "Ticket");
    println!("  {}", "-".repeat(50));
    for (request_id, ticket_id, price) in tracker.success_mappings() {
        println!(
            "  {:<22}{:<12}{:.5}",
            request_id.to_string(),
            format!("#{ticket_id}"),
            price.inner()
        );
    }
    println!("{RULE}\n");
}
