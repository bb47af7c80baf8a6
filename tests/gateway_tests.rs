//! Spreadsheet gateway integration tests
//!
//! Lazy connection, serialized calculations and recalculation waits,
//! exercised through the public API against in-memory workbooks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use interest_bridge::sheets::{
    CellRef, CellValue, Connector, InMemorySpreadsheet, SheetLayout, SpreadsheetClient,
    SpreadsheetInfo, Workbook,
};
use interest_bridge::{BridgeResult, CalculationRequest, RecalcWait, SpreadsheetGateway};

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

fn interest_formulas(wb: &mut Workbook) {
    let p = wb.number("Input", "B2");
    let r = wb.number("Input", "B3");
    let t = wb.number("Input", "B4");
    let _ = wb.set("Output", "B2", CellValue::Number(p * r * t / 100.0));
    let _ = wb.set(
        "Output",
        "B3",
        CellValue::Number(p * ((1.0 + r / 100.0).powf(t) - 1.0)),
    );
}

fn calculator() -> Arc<InMemorySpreadsheet> {
    Arc::new(
        InMemorySpreadsheet::new("Interest Calculator", &["Input", "Calc", "Output"])
            .with_recompute(interest_formulas),
    )
}

/// Counts connects and hands out the same spreadsheet client.
struct CountingConnector {
    client: Arc<dyn SpreadsheetClient>,
    connects: AtomicUsize,
}

impl CountingConnector {
    fn new(client: Arc<dyn SpreadsheetClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            connects: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Connector for CountingConnector {
    async fn connect(&self) -> BridgeResult<Arc<dyn SpreadsheetClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.client.clone())
    }
}

/// A sheet whose first `stale_reads` cell reads come back empty, like a
/// workbook that has not finished recomputing.
struct LaggingSheet {
    inner: Arc<InMemorySpreadsheet>,
    stale_reads: usize,
    reads: AtomicUsize,
}

#[async_trait]
impl SpreadsheetClient for LaggingSheet {
    async fn open(&self) -> BridgeResult<SpreadsheetInfo> {
        self.inner.open().await
    }

    async fn write_cell(&self, sheet: &str, cell: &CellRef, value: f64) -> BridgeResult<()> {
        self.reads.store(0, Ordering::SeqCst);
        self.inner.write_cell(sheet, cell, value).await
    }

    async fn read_cell(&self, sheet: &str, cell: &CellRef) -> BridgeResult<CellValue> {
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.stale_reads {
            return Ok(CellValue::Empty);
        }
        self.inner.read_cell(sheet, cell).await
    }
}

fn lagging(stale_reads: usize) -> Arc<dyn SpreadsheetClient> {
    Arc::new(LaggingSheet {
        inner: calculator(),
        stale_reads,
        reads: AtomicUsize::new(0),
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ═══════════════════════════════════════════════════════════════════════════
// END-TO-END TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_calculate_reference_values() {
    let connector = CountingConnector::new(calculator());
    let gateway = SpreadsheetGateway::new(connector.clone())
        .with_recalc(RecalcWait::Fixed(Duration::from_millis(1)));

    let outputs = gateway
        .calculate(&CalculationRequest::new(10000.0, 5.5, 3.0))
        .await
        .unwrap();
    assert_eq!(round2(outputs.simple_interest), 1650.0);
    assert_eq!(round2(outputs.compound_interest), 1742.41);
}

#[tokio::test]
async fn test_session_is_reused_across_calculations() {
    let connector = CountingConnector::new(calculator());
    let gateway = SpreadsheetGateway::new(connector.clone())
        .with_recalc(RecalcWait::Fixed(Duration::from_millis(1)));

    for principal in [100.0, 200.0, 300.0] {
        gateway
            .calculate(&CalculationRequest::new(principal, 5.0, 1.0))
            .await
            .unwrap();
    }
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONCURRENCY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_connect_once() {
    let connector = CountingConnector::new(calculator());
    let gateway = Arc::new(
        SpreadsheetGateway::new(connector.clone())
            .with_recalc(RecalcWait::Fixed(Duration::from_millis(1))),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.ensure_connected().await.map(|_| ()) })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    assert!(gateway.is_connected().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calculations_get_their_own_results() {
    let gateway = Arc::new(
        SpreadsheetGateway::new(CountingConnector::new(calculator()))
            .with_recalc(RecalcWait::Fixed(Duration::from_millis(10))),
    );

    let handles: Vec<_> = (1..=6)
        .map(|i| {
            let gateway = gateway.clone();
            let principal = 1000.0 * i as f64;
            tokio::spawn(async move {
                let outputs = gateway
                    .calculate(&CalculationRequest::new(principal, 10.0, 2.0))
                    .await
                    .unwrap();
                (principal, outputs)
            })
        })
        .collect();

    for handle in handles {
        let (principal, outputs) = handle.await.unwrap();
        assert_eq!(round2(outputs.simple_interest), round2(principal * 0.2));
        assert_eq!(round2(outputs.compound_interest), round2(principal * 0.21));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RECALCULATION WAIT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fixed_wait_can_return_stale_values() {
    let gateway = SpreadsheetGateway::new(CountingConnector::new(lagging(2)))
        .with_recalc(RecalcWait::Fixed(Duration::from_millis(1)));

    let outputs = gateway
        .calculate(&CalculationRequest::new(10000.0, 5.5, 3.0))
        .await
        .unwrap();
    assert_eq!(outputs.simple_interest, 0.0);
    assert_eq!(outputs.compound_interest, 0.0);
}

#[tokio::test]
async fn test_until_stable_waits_out_lagging_recompute() {
    let gateway = SpreadsheetGateway::new(CountingConnector::new(lagging(2))).with_recalc(
        RecalcWait::UntilStable {
            interval: Duration::from_millis(1),
            max_polls: 5,
        },
    );

    let outputs = gateway
        .calculate(&CalculationRequest::new(10000.0, 5.5, 3.0))
        .await
        .unwrap();
    assert_eq!(round2(outputs.simple_interest), 1650.0);
    assert_eq!(round2(outputs.compound_interest), 1742.41);
}

#[tokio::test]
async fn test_until_stable_gives_up_after_max_polls() {
    // Lags longer than the poll budget; the last read is returned.
    let gateway = SpreadsheetGateway::new(CountingConnector::new(lagging(100))).with_recalc(
        RecalcWait::UntilStable {
            interval: Duration::from_millis(1),
            max_polls: 1,
        },
    );

    let outputs = gateway
        .calculate(&CalculationRequest::new(500.0, 5.0, 1.0))
        .await
        .unwrap();
    assert_eq!(outputs.simple_interest, 0.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// CUSTOM LAYOUT TESTS
// ═══════════════════════════════════════════════════════════════════════════

fn custom_layout() -> SheetLayout {
    SheetLayout {
        input_sheet: "Inputs".into(),
        calc_sheet: "Formulas".into(),
        output_sheet: "Results".into(),
        principal_cell: "C5".parse().unwrap(),
        rate_cell: "C6".parse().unwrap(),
        time_cell: "C7".parse().unwrap(),
        simple_interest_cell: "$D$2".parse().unwrap(),
        compound_interest_cell: "d3".parse().unwrap(),
    }
}

#[tokio::test]
async fn test_calculate_with_custom_layout() {
    let sheet = Arc::new(
        InMemorySpreadsheet::new("Custom", &["Inputs", "Formulas", "Results"]).with_recompute(
            |wb| {
                let p = wb.number("Inputs", "C5");
                let r = wb.number("Inputs", "C6");
                let t = wb.number("Inputs", "C7");
                let _ = wb.set("Results", "D2", CellValue::Number(p * r * t / 100.0));
                let _ = wb.set("Results", "D3", CellValue::Number(-1.0));
            },
        ),
    );
    let gateway = SpreadsheetGateway::new(CountingConnector::new(sheet.clone()))
        .with_layout(custom_layout())
        .with_recalc(RecalcWait::Fixed(Duration::from_millis(1)));
    assert_eq!(gateway.layout(), &custom_layout());

    let outputs = gateway
        .calculate(&CalculationRequest::new(10000.0, 5.5, 3.0))
        .await
        .unwrap();
    assert_eq!(round2(outputs.simple_interest), 1650.0);
    assert_eq!(outputs.compound_interest, -1.0);

    sheet.with_workbook(|wb| {
        assert_eq!(wb.number("Inputs", "C5"), 10000.0);
        assert_eq!(wb.number("Inputs", "C6"), 5.5);
        assert_eq!(wb.number("Inputs", "C7"), 3.0);
    });

    let report = gateway.verify_structure().await.unwrap();
    assert!(report.ok, "{}", report.message);
}

#[tokio::test]
async fn test_custom_layout_reports_its_own_missing_sheets() {
    // The default Input/Calc/Output names exist, the custom ones do not.
    let gateway = SpreadsheetGateway::new(CountingConnector::new(calculator()))
        .with_layout(custom_layout());
    gateway.connect().await.unwrap();

    let report = gateway.verify_structure().await.unwrap();
    assert_eq!(report.missing, vec!["Inputs", "Formulas", "Results"]);
}
