//! Operator-facing message catalogue and backend error translation.
//!
//! The backend reports import problems as rendered sentences tagged with a
//! row number, e.g. `"Invalid email address (row: 4)"`, in whatever locale
//! it was asked for. [`translate_error`] maps such a sentence back to its
//! catalogue key and re-renders it in the operator's locale.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

/// Operator display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Tr,
    En,
    Fr,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Tr, Locale::En, Locale::Fr];

    /// Language tag sent as `Accept-Language`.
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::Tr => "tr",
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s.trim().split(['-', '_']).next().unwrap_or_default();
        match lang.to_lowercase().as_str() {
            "tr" => Ok(Locale::Tr),
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            _ => Err(format!("Unsupported locale: {}", s)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Keys the backend uses for row-level import failures.
pub const IMPORT_ERROR_KEYS: [&str; 9] = [
    "invalidEmail",
    "missingFirstName",
    "missingLastName",
    "missingQrId",
    "duplicateEmailInFile",
    "duplicateEmailInDb",
    "duplicateQrIdInDb",
    "plusOneNotAllowed",
    "invalidGuestType",
];

// (key, tr, en, fr); `{{row}}` is replaced by the source row number.
static CATALOGUE: &[(&str, &str, &str, &str)] = &[
    (
        "invalidEmail",
        "Geçersiz e-posta adresi (satır: {{row}})",
        "Invalid email address (row: {{row}})",
        "Adresse e-mail invalide (ligne: {{row}})",
    ),
    (
        "missingFirstName",
        "Ad alanı eksik (satır: {{row}})",
        "First name is missing (row: {{row}})",
        "Prénom manquant (ligne: {{row}})",
    ),
    (
        "missingLastName",
        "Soyad alanı eksik (satır: {{row}})",
        "Last name is missing (row: {{row}})",
        "Nom manquant (ligne: {{row}})",
    ),
    (
        "missingQrId",
        "QR kimliği eksik (satır: {{row}})",
        "QR id is missing (row: {{row}})",
        "Identifiant QR manquant (ligne: {{row}})",
    ),
    (
        "duplicateEmailInFile",
        "E-posta dosyada birden fazla kez geçiyor (satır: {{row}})",
        "Email appears more than once in the file (row: {{row}})",
        "L'adresse e-mail apparaît plusieurs fois dans le fichier (ligne: {{row}})",
    ),
    (
        "duplicateEmailInDb",
        "E-posta zaten kayıtlı (satır: {{row}})",
        "Email is already registered (row: {{row}})",
        "L'adresse e-mail est déjà enregistrée (ligne: {{row}})",
    ),
    (
        "duplicateQrIdInDb",
        "QR kimliği zaten kayıtlı (satır: {{row}})",
        "QR id is already registered (row: {{row}})",
        "L'identifiant QR est déjà enregistré (ligne: {{row}})",
    ),
    (
        "plusOneNotAllowed",
        "Bu misafir türü için ek kişi eklenemez (satır: {{row}})",
        "Plus-ones are not allowed for this guest type (row: {{row}})",
        "Les accompagnants ne sont pas autorisés pour ce type d'invité (ligne: {{row}})",
    ),
    (
        "invalidGuestType",
        "Geçersiz misafir türü (satır: {{row}})",
        "Invalid guest type (row: {{row}})",
        "Type d'invité invalide (ligne: {{row}})",
    ),
    (
        "alreadyCheckedIn",
        "Katılımcı zaten giriş yaptı",
        "Participant already checked in",
        "Participant déjà enregistré",
    ),
    (
        "guestNotFound",
        "Davetli bulunamadı",
        "Guest not found",
        "Invité introuvable",
    ),
    (
        "qrIdEmpty",
        "QR kimliği boş olamaz",
        "QR id cannot be empty",
        "L'identifiant QR ne peut pas être vide",
    ),
    (
        "qrCodeReadError",
        "QR kod okunamadı",
        "QR code could not be read",
        "Le code QR n'a pas pu être lu",
    ),
    (
        "unknownColumn",
        "Bilinmeyen sütun",
        "Unknown column",
        "Colonne inconnue",
    ),
    ("error", "Hata", "Error", "Erreur"),
    (
        "invalid_credentials",
        "Geçersiz kullanıcı adı veya şifre",
        "Invalid username or password",
        "Nom d'utilisateur ou mot de passe invalide",
    ),
    (
        "session_expired",
        "Oturumunuzun süresi doldu, lütfen tekrar giriş yapın",
        "Your session has expired, please log in again",
        "Votre session a expiré, veuillez vous reconnecter",
    ),
    (
        "unauthorizedError",
        "Bu işlem için yetkiniz yok",
        "You are not authorized for this action",
        "Vous n'êtes pas autorisé à effectuer cette action",
    ),
    ("serverError", "Sunucu hatası", "Server error", "Erreur du serveur"),
    (
        "networkError",
        "Sunucuya ulaşılamıyor",
        "Cannot reach the server",
        "Impossible de joindre le serveur",
    ),
    (
        "checkInFailed",
        "Giriş işlemi başarısız",
        "Check-in failed",
        "L'enregistrement a échoué",
    ),
    (
        "invalidFileType",
        "Yalnızca .xlsx ve .xls dosyaları yüklenebilir",
        "Only .xlsx and .xls files can be uploaded",
        "Seuls les fichiers .xlsx et .xls sont acceptés",
    ),
    (
        "noFileSelected",
        "Dosya seçilmedi",
        "No file selected",
        "Aucun fichier sélectionné",
    ),
    ("uploadFailed", "Yükleme başarısız", "Upload failed", "Échec du téléversement"),
    (
        "retryFailed",
        "Yeniden deneme başarısız",
        "Retry failed",
        "La nouvelle tentative a échoué",
    ),
    (
        "empty_fields",
        "Lütfen tüm alanları doldurun",
        "Please fill in all fields",
        "Veuillez remplir tous les champs",
    ),
    (
        "inviter_required",
        "Ek kişi için davet eden seçilmelidir",
        "A plus-one needs an inviter",
        "Un accompagnant doit avoir un invitant",
    ),
    (
        "plusOneLimitReached",
        "Ek kişi sınırına ulaşıldı",
        "Plus-one limit reached",
        "Limite d'accompagnants atteinte",
    ),
    (
        "usernameRequired",
        "Kullanıcı adı gerekli",
        "Username is required",
        "Nom d'utilisateur requis",
    ),
    (
        "passwordRequired",
        "Şifre gerekli",
        "Password is required",
        "Mot de passe requis",
    ),
    (
        "rolesRequired",
        "En az bir rol seçilmelidir",
        "Select at least one role",
        "Sélectionnez au moins un rôle",
    ),
    (
        "rsvpDisabled",
        "LCV yanıtları kapalı",
        "RSVP is closed",
        "Les réponses sont fermées",
    ),
    (
        "selectGuests",
        "Lütfen en az bir davetli seçin",
        "Please select at least one guest",
        "Veuillez sélectionner au moins un invité",
    ),
];

lazy_static! {
    static ref ROW_TAGGED: Regex =
        Regex::new(r"(.+?)\s*\((?:satır|row|ligne):\s*(\d+)\)").expect("valid row-tag pattern");
}

fn entry(key: &str) -> Option<&'static (&'static str, &'static str, &'static str, &'static str)> {
    CATALOGUE.iter().find(|(k, ..)| *k == key)
}

fn template(key: &str, locale: Locale) -> Option<&'static str> {
    entry(key).map(|(_, tr, en, fr)| match locale {
        Locale::Tr => *tr,
        Locale::En => *en,
        Locale::Fr => *fr,
    })
}

/// Localised text for a catalogue key, or `None` for unknown keys.
pub fn translate(locale: Locale, key: &str) -> Option<&'static str> {
    template(key, locale)
}

/// Localised text for a key, falling back to the key itself.
pub fn text(locale: Locale, key: &str) -> String {
    translate(locale, key).unwrap_or(key).to_string()
}

/// Renders a row-tagged template.
pub fn render_row(locale: Locale, key: &str, row: &str) -> Option<String> {
    template(key, locale).map(|t| t.replace("{{row}}", row))
}

/// True when `message` is the key itself or its rendering in any locale.
pub fn is_message_for(message: &str, key: &str) -> bool {
    let message = message.trim();
    message == key
        || Locale::ALL
            .iter()
            .any(|l| template(key, *l).is_some_and(|t| t == message))
}

/// Re-renders a backend import error in the operator's locale.
pub fn translate_error(raw: &str, locale: Locale) -> String {
    if let Some(caps) = ROW_TAGGED.captures(raw) {
        let base = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let row = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if !base.is_empty() {
            for key in IMPORT_ERROR_KEYS {
                let known = Locale::ALL.iter().any(|l| {
                    render_row(*l, key, row).is_some_and(|rendered| rendered.contains(base))
                });
                if known {
                    if let Some(rendered) = render_row(locale, key, row) {
                        return rendered;
                    }
                }
            }
        }
    }

    match translate(locale, raw.trim()) {
        Some(text) if !text.contains("{{row}}") => text.to_string(),
        _ => raw.to_string(),
    }
}
