//! Integration tests for invoice creation, editing, deletion and listing.

mod common;

use common::*;
use gst_ledger_service::ledger::{FinancialYear, Period};
use gst_ledger_service::models::ListInvoicesFilter;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

#[tokio::test]
async fn create_intra_state_invoice_splits_tax_and_bills_client() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");

    let invoice = &created.invoice;
    assert_eq!(invoice.invoice_number, "1/2024-25");
    assert_eq!(invoice.business_id, business.business_id);
    assert_eq!(invoice.total_before_tax, d("250"));
    assert_eq!(invoice.cgst, d("22.50"));
    assert_eq!(invoice.sgst, d("22.50"));
    assert_eq!(invoice.igst, Decimal::ZERO);
    assert_eq!(invoice.total_after_tax, d("295"));
    assert_eq!(
        invoice.amount_in_words,
        "Two Hundred and Ninety Five Rupees Only"
    );

    assert_eq!(created.items.len(), 2);
    assert_eq!(created.items[0].description, "Keyboard");
    assert_eq!(created.items[0].net_amount, d("200"));
    assert_eq!(created.items[0].position, 0);
    assert_eq!(created.items[1].position, 1);

    let client = reload_client(&ledger, client.client_id).await;
    assert_eq!(client.total_billed, d("295"));
    assert_eq!(client.outstanding_balance(), d("295"));
}

#[tokio::test]
async fn create_inter_state_invoice_charges_igst() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client =
        create_test_client(&ledger, business.business_id, "bengaluru", OTHER_STATE_CODE).await;

    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");

    assert_eq!(created.invoice.cgst, Decimal::ZERO);
    assert_eq!(created.invoice.sgst, Decimal::ZERO);
    assert_eq!(created.invoice.igst, d("45"));
    assert_eq!(created.invoice.total_after_tax, d("295"));
}

#[tokio::test]
async fn invoice_numbers_continue_across_clients_and_financial_years() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let first = create_test_client(&ledger, business.business_id, "first", HOME_STATE_CODE).await;
    let second =
        create_test_client(&ledger, business.business_id, "second", OTHER_STATE_CODE).await;

    let a = ledger
        .invoices
        .create_invoice(first.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create first invoice");
    let b = ledger
        .invoices
        .create_invoice(second.client_id, &standard_draft(date(2025, 2, 1)))
        .await
        .expect("Failed to create second invoice");
    let c = ledger
        .invoices
        .create_invoice(first.client_id, &standard_draft(date(2025, 4, 2)))
        .await
        .expect("Failed to create third invoice");

    assert_eq!(a.invoice.invoice_number, "1/2024-25");
    assert_eq!(b.invoice.invoice_number, "2/2024-25");
    assert_eq!(c.invoice.invoice_number, "3/2025-26");
}

#[tokio::test]
async fn invoice_numbers_are_independent_per_business() {
    let ledger = spawn_ledger();
    let first_business = create_test_business(&ledger).await;
    let second_business = create_test_business(&ledger).await;
    let first =
        create_test_client(&ledger, first_business.business_id, "acme", HOME_STATE_CODE).await;
    let second =
        create_test_client(&ledger, second_business.business_id, "acme", HOME_STATE_CODE).await;

    ledger
        .invoices
        .create_invoice(first.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");
    let other = ledger
        .invoices
        .create_invoice(second.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");

    assert_eq!(other.invoice.invoice_number, "1/2024-25");
}

#[tokio::test]
async fn create_invoice_rejects_empty_items() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    let result = ledger
        .invoices
        .create_invoice(client.client_id, &draft(date(2024, 6, 15), vec![]))
        .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    let client = reload_client(&ledger, client.client_id).await;
    assert_eq!(client.total_billed, Decimal::ZERO);
}

#[tokio::test]
async fn create_invoice_rejects_non_positive_rate_and_quantity() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    let zero_rate = draft(date(2024, 6, 15), vec![item("Free sample", "0", 1)]);
    let zero_quantity = draft(date(2024, 6, 15), vec![item("Keyboard", "100", 0)]);

    for bad in [zero_rate, zero_quantity] {
        let result = ledger.invoices.create_invoice(client.client_id, &bad).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}

#[tokio::test]
async fn create_invoice_rejects_amounts_beyond_column_range() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    // Rates past the money column limit fail validation.
    for rate in ["10000000000", "79228162514264337593543950335"] {
        let result = ledger
            .invoices
            .create_invoice(
                client.client_id,
                &draft(date(2024, 6, 15), vec![item("Turbine", rate, 1)]),
            )
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    // Each rate fits, but the line and the invoice total do not.
    let oversized = [
        draft(date(2024, 6, 15), vec![item("Turbine", "9999999999.99", 2)]),
        draft(
            date(2024, 6, 15),
            vec![
                item("Turbine", "9999999999.99", 1),
                item("Generator", "9999999999.99", 1),
            ],
        ),
        draft(date(2024, 6, 15), vec![item("Turbine", "9000000000", 1)]),
    ];
    for bad in &oversized {
        let result = ledger.invoices.create_invoice(client.client_id, bad).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        Decimal::ZERO
    );
    let listed = ledger
        .invoices
        .list_invoices_for_client(client.client_id, &ListInvoicesFilter::default())
        .await
        .expect("Failed to list invoices");
    assert!(listed.is_empty());
}

#[tokio::test]
async fn create_invoice_for_unknown_client_is_not_found() {
    let ledger = spawn_ledger();

    let result = ledger
        .invoices
        .create_invoice(Uuid::new_v4(), &standard_draft(date(2024, 6, 15)))
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn failed_item_write_leaves_no_invoice_and_total_unchanged() {
    let store = gst_ledger_service::services::MemoryStore::new();
    let ledger = gst_ledger_service::AppState::new(store.clone());
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    store.fail_on("insert_item");
    let result = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await;
    store.clear_failure();

    assert!(matches!(result, Err(AppError::DatabaseError(_))));

    let listed = ledger
        .invoices
        .list_invoices_for_client(client.client_id, &ListInvoicesFilter::default())
        .await
        .expect("Failed to list invoices");
    assert!(listed.is_empty());
    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        Decimal::ZERO
    );

    // The aborted attempt does not consume a number.
    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice after failure cleared");
    assert_eq!(created.invoice.invoice_number, "1/2024-25");
}

#[tokio::test]
async fn failed_commit_leaves_total_unchanged() {
    let store = gst_ledger_service::services::MemoryStore::new();
    let ledger = gst_ledger_service::AppState::new(store.clone());
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;
    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");

    store.fail_on("commit");
    let result = ledger
        .invoices
        .delete_invoice(created.invoice.invoice_id, client.client_id)
        .await;
    store.clear_failure();

    assert!(result.is_err());
    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        d("295")
    );
    ledger
        .invoices
        .get_invoice(created.invoice.invoice_id, client.client_id)
        .await
        .expect("Invoice should survive the failed delete");
}

#[tokio::test]
async fn failed_edit_restores_items_and_total() {
    let store = gst_ledger_service::services::MemoryStore::new();
    let ledger = gst_ledger_service::AppState::new(store.clone());
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;
    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");
    let original_ids: Vec<Uuid> = created.items.iter().map(|i| i.item_id).collect();

    // Drops the mouse and rewrites the keyboard before the new line fails to insert.
    store.fail_on("insert_item");
    let result = ledger
        .invoices
        .edit_invoice(
            created.invoice.invoice_id,
            client.client_id,
            &draft(
                date(2024, 7, 1),
                vec![
                    existing_item(original_ids[0], "Keyboard", "100", 5),
                    item("Monitor", "1000", 1),
                ],
            ),
        )
        .await;
    store.clear_failure();

    assert!(matches!(result, Err(AppError::DatabaseError(_))));

    let stored = ledger
        .invoices
        .get_invoice(created.invoice.invoice_id, client.client_id)
        .await
        .expect("Failed to get invoice");
    assert_eq!(
        stored.items.iter().map(|i| i.item_id).collect::<Vec<_>>(),
        original_ids
    );
    assert_eq!(stored.items[0].quantity, 2);
    assert_eq!(stored.invoice.invoice_date, date(2024, 6, 15));
    assert_eq!(stored.invoice.total_after_tax, d("295"));
    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        d("295")
    );
}

#[tokio::test]
async fn edit_invoice_updates_keeps_and_removes_items() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;
    let created = ledger
        .invoices
        .create_invoice(
            client.client_id,
            &draft(
                date(2024, 6, 15),
                vec![
                    item("Keyboard", "100", 2),
                    item("Mouse", "50", 1),
                    item("Cable", "10", 5),
                ],
            ),
        )
        .await
        .expect("Failed to create invoice");
    let keyboard = created.items[0].item_id;
    let cable = created.items[2].item_id;

    // Drop the mouse, move the cable first, change the keyboard quantity and add a new line.
    let edited = ledger
        .invoices
        .edit_invoice(
            created.invoice.invoice_id,
            client.client_id,
            &draft(
                date(2024, 7, 1),
                vec![
                    existing_item(cable, "Cable", "10", 5),
                    existing_item(keyboard, "Keyboard", "100", 1),
                    item("Monitor", "1000", 1),
                ],
            ),
        )
        .await
        .expect("Failed to edit invoice");

    assert_eq!(edited.invoice.invoice_number, created.invoice.invoice_number);
    assert_eq!(edited.invoice.invoice_date, date(2024, 7, 1));
    assert_eq!(edited.invoice.total_before_tax, d("1150"));
    assert_eq!(edited.invoice.cgst, d("103.50"));
    assert_eq!(edited.invoice.total_after_tax, d("1357"));

    let stored = ledger
        .invoices
        .get_invoice(created.invoice.invoice_id, client.client_id)
        .await
        .expect("Failed to get invoice");
    let ids: Vec<Uuid> = stored.items.iter().map(|i| i.item_id).collect();
    assert_eq!(stored.items.len(), 3);
    assert_eq!(ids[0], cable);
    assert_eq!(ids[1], keyboard);
    assert!(!ids.contains(&created.items[1].item_id));
    assert_eq!(stored.items[1].quantity, 1);
    assert_eq!(stored.items[2].description, "Monitor");
    assert_eq!(
        stored.items.iter().map(|i| i.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        d("1357")
    );
}

#[tokio::test]
async fn edit_invoice_inserts_items_with_foreign_ids_under_fresh_ids() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;
    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");
    let foreign = Uuid::new_v4();

    let edited = ledger
        .invoices
        .edit_invoice(
            created.invoice.invoice_id,
            client.client_id,
            &draft(
                date(2024, 6, 15),
                vec![existing_item(foreign, "Keyboard", "100", 2)],
            ),
        )
        .await
        .expect("Failed to edit invoice");

    assert_eq!(edited.items.len(), 1);
    assert_ne!(edited.items[0].item_id, foreign);
    assert!(created
        .items
        .iter()
        .all(|old| old.item_id != edited.items[0].item_id));
    assert_eq!(edited.invoice.total_after_tax, d("236"));
}

#[tokio::test]
async fn edit_invoice_rejects_duplicate_item_ids() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;
    let created = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");
    let keyboard = created.items[0].item_id;

    let result = ledger
        .invoices
        .edit_invoice(
            created.invoice.invoice_id,
            client.client_id,
            &draft(
                date(2024, 6, 15),
                vec![
                    existing_item(keyboard, "Keyboard", "100", 2),
                    existing_item(keyboard, "Keyboard", "100", 3),
                ],
            ),
        )
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    let stored = ledger
        .invoices
        .get_invoice(created.invoice.invoice_id, client.client_id)
        .await
        .expect("Failed to get invoice");
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.invoice.total_after_tax, d("295"));
}

#[tokio::test]
async fn invoices_of_other_clients_are_not_found() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let owner = create_test_client(&ledger, business.business_id, "owner", HOME_STATE_CODE).await;
    let other = create_test_client(&ledger, business.business_id, "other", HOME_STATE_CODE).await;
    let created = ledger
        .invoices
        .create_invoice(owner.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");
    let invoice_id = created.invoice.invoice_id;

    let get = ledger.invoices.get_invoice(invoice_id, other.client_id).await;
    let edit = ledger
        .invoices
        .edit_invoice(
            invoice_id,
            other.client_id,
            &standard_draft(date(2024, 6, 15)),
        )
        .await;
    let delete = ledger
        .invoices
        .delete_invoice(invoice_id, other.client_id)
        .await;

    assert!(matches!(get, Err(AppError::NotFound(_))));
    assert!(matches!(edit, Err(AppError::NotFound(_))));
    assert!(matches!(delete, Err(AppError::NotFound(_))));
    assert_eq!(
        reload_client(&ledger, owner.client_id).await.total_billed,
        d("295")
    );
    assert_eq!(
        reload_client(&ledger, other.client_id).await.total_billed,
        Decimal::ZERO
    );
}

#[tokio::test]
async fn delete_invoice_recomputes_billed_total() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;
    let first = ledger
        .invoices
        .create_invoice(client.client_id, &standard_draft(date(2024, 6, 15)))
        .await
        .expect("Failed to create invoice");
    ledger
        .invoices
        .create_invoice(
            client.client_id,
            &draft(date(2024, 6, 20), vec![item("Monitor", "1000", 1)]),
        )
        .await
        .expect("Failed to create invoice");
    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        d("1475")
    );

    ledger
        .invoices
        .delete_invoice(first.invoice.invoice_id, client.client_id)
        .await
        .expect("Failed to delete invoice");

    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        d("1180")
    );
    let missing = ledger
        .invoices
        .get_invoice(first.invoice.invoice_id, client.client_id)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_invoices_orders_by_number_and_paginates() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    for day in 1..=12 {
        ledger
            .invoices
            .create_invoice(client.client_id, &standard_draft(date(2024, 6, day)))
            .await
            .expect("Failed to create invoice");
    }

    let first_page = ledger
        .invoices
        .list_invoices_for_client(client.client_id, &ListInvoicesFilter::default())
        .await
        .expect("Failed to list invoices");
    assert_eq!(first_page.len(), 10);
    assert_eq!(first_page[0].invoice.invoice_number, "12/2024-25");
    assert_eq!(first_page[9].invoice.invoice_number, "3/2024-25");
    assert!(first_page.iter().all(|i| i.items.len() == 2));

    let second_page = ledger
        .invoices
        .list_invoices_for_client(
            client.client_id,
            &ListInvoicesFilter::new(Period::All, Some(2), None).expect("Invalid filter"),
        )
        .await
        .expect("Failed to list invoices");
    let numbers: Vec<&str> = second_page
        .iter()
        .map(|i| i.invoice.invoice_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["2/2024-25", "1/2024-25"]);
}

#[tokio::test]
async fn list_invoices_filters_by_financial_year() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    for invoice_date in [date(2024, 3, 31), date(2024, 4, 1), date(2025, 3, 31), date(2025, 4, 1)] {
        ledger
            .invoices
            .create_invoice(client.client_id, &standard_draft(invoice_date))
            .await
            .expect("Failed to create invoice");
    }

    let period =
        Period::financial_year(FinancialYear::starting(2024)).expect("Invalid financial year");
    let filter = ListInvoicesFilter::new(period, None, None).expect("Invalid filter");
    let listed = ledger
        .invoices
        .list_invoices_for_client(client.client_id, &filter)
        .await
        .expect("Failed to list invoices");

    let numbers: Vec<&str> = listed
        .iter()
        .map(|i| i.invoice.invoice_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["3/2024-25", "2/2024-25"]);
}

#[tokio::test]
async fn list_invoices_for_unknown_client_is_not_found() {
    let ledger = spawn_ledger();

    let result = ledger
        .invoices
        .list_invoices_for_client(Uuid::new_v4(), &ListInvoicesFilter::default())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn concurrent_creates_allocate_distinct_numbers() {
    let ledger = spawn_ledger();
    let business = create_test_business(&ledger).await;
    let client = create_test_client(&ledger, business.business_id, "acme", HOME_STATE_CODE).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let ledger = ledger.clone();
        let client_id = client.client_id;
        handles.push(tokio::spawn(async move {
            ledger
                .invoices
                .create_invoice(client_id, &standard_draft(date(2024, 6, 15)))
                .await
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        let created = handle
            .await
            .expect("Task panicked")
            .expect("Failed to create invoice");
        numbers.push(created.invoice.invoice_number);
    }
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 5);
    assert_eq!(
        reload_client(&ledger, client.client_id).await.total_billed,
        d("1475")
    );
}
