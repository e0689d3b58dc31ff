mod jury_test;

use crate::host::BlockContext;
use crate::testing::{ctx_with_documents, TribunalFixture};
use crate::tribunal::TribunalOperations;

/// Opens a falsification tribunal by `validator` on the fixture's paper at time 100.
fn open_falsification(fixture: &mut TribunalFixture) -> BlockContext {
    let ctx = ctx_with_documents(100, &["evidence-1", "evidence-2"]);
    fixture
        .state
        .create_falsification_tribunal("validator", fixture.paper_id, "evidence-1", &ctx)
        .unwrap();
    ctx
}
