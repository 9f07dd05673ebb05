//! Pointer state → cursor command translation.

use crate::command::{CursorCommand, CursorEncoding, CursorShape};
use crate::source::{PointerShapeKind, PointerUpdate};

/// Build a cursor move command, or `None` when the backend reported the
/// pointer unchanged since the last acquisition (`last_update == 0`).
pub fn move_command(update: &PointerUpdate) -> Option<CursorCommand> {
    if update.last_update == 0 {
        return None;
    }
    Some(CursorCommand::Move { x: update.x, y: update.y, visible: update.visible })
}

/// Build a cursor set command, or `None` when no new shape was reported.
///
/// Monochrome shapes arrive with the AND and XOR masks stacked vertically in
/// one buffer, so the reported height is twice the cursor's: the command
/// declares half of it. Masked-color shapes are not supported by the sink and
/// are declared as alpha instead.
pub fn set_command(update: &PointerUpdate) -> Option<CursorCommand> {
    let shape = update.shape.as_ref()?;
    if shape.data.is_empty() {
        return None;
    }

    let (encoding, height) = match shape.kind {
        PointerShapeKind::Monochrome => (CursorEncoding::Mono, shape.height / 2),
        PointerShapeKind::Color => (CursorEncoding::Alpha, shape.height),
        PointerShapeKind::MaskedColor => {
            tracing::warn!(
                width = shape.width,
                height = shape.height,
                "masked-color pointer shape not supported; declaring as alpha"
            );
            (CursorEncoding::Alpha, shape.height)
        }
    };

    Some(CursorCommand::Set(CursorShape::new(
        encoding,
        shape.width,
        height,
        shape.hot_x,
        shape.hot_y,
        &shape.data,
    )))
}
