use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    AccountsRemoved,
    AccountRemoved,
    AccountRestored,
    AccountLabel,
    ClientLabel,
    PermissionDenied,
    InvalidAction,
    SessionExpired,
    AccountNotFound,
    NoItemsSelected,
    IdRequired,
    BatchDeleteFailed,
    InternalError,
    GridName,
    GridClient,
    GridDate,
    GridStatus,
    StatusModified,
    StatusDeleted,
    ActionRestore,
    ActionDelete,
    NoRecords,
}

pub fn tr(locale: Locale, message: Message) -> &'static str {
    match locale {
        Locale::En => en(message),
        Locale::Es => es(message),
    }
}

fn en(message: Message) -> &'static str {
    match message {
        Message::AccountsRemoved => "Accounts removed",
        Message::AccountRemoved => "Account removed",
        Message::AccountRestored => "Account restored",
        Message::AccountLabel => "Account",
        Message::ClientLabel => "Client",
        Message::PermissionDenied => "You don't have permission to do this operation",
        Message::InvalidAction => "Invalid action",
        Message::SessionExpired => "Session not started or timed out",
        Message::AccountNotFound => "Account not found",
        Message::NoItemsSelected => "No items selected",
        Message::IdRequired => "Item id is required",
        Message::BatchDeleteFailed => "Error while deleting the accounts",
        Message::InternalError => "Internal error",
        Message::GridName => "Name",
        Message::GridClient => "Client",
        Message::GridDate => "Date",
        Message::GridStatus => "Status",
        Message::StatusModified => "Modified",
        Message::StatusDeleted => "Deleted",
        Message::ActionRestore => "Restore account",
        Message::ActionDelete => "Delete history",
        Message::NoRecords => "No records found",
    }
}

fn es(message: Message) -> &'static str {
    match message {
        Message::AccountsRemoved => "Cuentas eliminadas",
        Message::AccountRemoved => "Cuenta eliminada",
        Message::AccountRestored => "Cuenta restaurada",
        Message::AccountLabel => "Cuenta",
        Message::ClientLabel => "Cliente",
        Message::PermissionDenied => "No tiene permisos para realizar esta operación",
        Message::InvalidAction => "Acción inválida",
        Message::SessionExpired => "Sesión no iniciada o caducada",
        Message::AccountNotFound => "Cuenta no encontrada",
        Message::NoItemsSelected => "No hay elementos seleccionados",
        Message::IdRequired => "Es necesario el id del elemento",
        Message::BatchDeleteFailed => "Error al eliminar las cuentas",
        Message::InternalError => "Error interno",
        Message::GridName => "Nombre",
        Message::GridClient => "Cliente",
        Message::GridDate => "Fecha",
        Message::GridStatus => "Estado",
        Message::StatusModified => "Modificada",
        Message::StatusDeleted => "Eliminada",
        Message::ActionRestore => "Restaurar cuenta",
        Message::ActionDelete => "Eliminar historial",
        Message::NoRecords => "No se encontraron registros",
    }
}

/// User-facing text for an error code. Codes not listed here collapse into a
/// generic message so storage details never reach the caller.
pub fn error_message(locale: Locale, code: &str) -> &'static str {
    let message = match code {
        "ACCESS_DENIED" => Message::PermissionDenied,
        "CSRF_TOKEN_INVALID" => Message::InvalidAction,
        "SESSION_REQUIRED" => Message::SessionExpired,
        "ACCOUNT_HISTORY_NOT_FOUND" | "ACCOUNT_NOT_FOUND" => Message::AccountNotFound,
        "NO_ITEMS_SELECTED" => Message::NoItemsSelected,
        "ID_REQUIRED" => Message::IdRequired,
        "ACCOUNT_HISTORY_BATCH_MISMATCH" => Message::BatchDeleteFailed,
        _ => Message::InternalError,
    };
    tr(locale, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_codes_do_not_leak() {
        assert_eq!(error_message(Locale::En, "DB_QUERY_FAILED"), "Internal error");
        assert_eq!(error_message(Locale::Es, "DB_POOL_UNAVAILABLE"), "Error interno");
    }

    #[test]
    fn known_codes_are_localized() {
        assert_eq!(
            error_message(Locale::En, "ACCESS_DENIED"),
            "You don't have permission to do this operation"
        );
        assert_eq!(error_message(Locale::Es, "ACCOUNT_NOT_FOUND"), "Cuenta no encontrada");
    }
}
