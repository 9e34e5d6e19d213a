use std::fmt;

// Domain-level errors for account keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    MissingKey,
    MalformedKey,
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::MissingKey => f.write_str("no private key available; generate an account first"),
            AccountError::MalformedKey => f.write_str("private key is malformed"),
        }
    }
}

impl std::error::Error for AccountError {}

// Domain-level errors for bet amounts.
#[derive(Debug, Clone, PartialEq)]
pub enum BetError {
    NotFinite,
    Negative(f64),
    Fractional(f64),
    TooLarge(f64),
}

impl fmt::Display for BetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetError::NotFinite => f.write_str("bet amount must be a finite number"),
            BetError::Negative(amount) => write!(f, "bet amount must not be negative (got {amount})"),
            BetError::Fractional(amount) => {
                write!(f, "bet amount must be a whole number of chips (got {amount})")
            }
            BetError::TooLarge(amount) => write!(f, "bet amount {amount} is out of range"),
        }
    }
}

impl std::error::Error for BetError {}
