//! Instructions sent to the generation collaborator and the deterministic
//! text templates used when its output is missing or unusable.

use chrono::NaiveDate;

use crate::intent::IntentClassification;
use crate::mode::ModeHint;
use crate::normalize::{normalize_text, strip_markup};
use crate::notes::NoteKind;

pub const EMPTY_NOTE_PLACEHOLDER: &str = "(пусто)";

/// Appended to the user prompt on the second attempt.
pub const STRICT_RETRY_SUFFIX: &str = "\n\nСТРОГО: верни только JSON без любого другого текста. \
Формат: {\"reply\": \"текст\", \"writes\": []}";

const TURN_SYSTEM_PROMPT: &str = "\
Ты ведёшь дневник тренировок, питания и планов пользователя в мессенджере.
Пиши простым текстом без Markdown: никаких звёздочек, подчёркиваний, решёток и обратных кавычек.
Короткие абзацы, уместные эмодзи.

Отвечай ровно одним JSON-объектом:
{
  \"reply\": \"ответ пользователю\",
  \"writes\": [
    {\"d\": \"YYYY-MM-DD\", \"kind\": \"workouts|meals|plan\", \"mode\": \"append|replace\", \"text\": \"что записать\"}
  ]
}

Куда писать:
- workouts (mode=append): упражнения, подходы, повторения, вес, короткие записи вроде \"3х10 60кг\".
- meals (mode=append): приёмы пищи, продукты, калории.
- plan (mode=replace): только когда пользователь просит составить или расписать план.
- Если mode_hint противоречит явному смыслу сообщения, прав пользователь.
- Обычный разговор без данных для дневника: writes пустой.

Планы тренировок:
- 5-7 упражнений, у каждого подходы, повторения и вес в кг.
- Формат строки: \"Жим лёжа: 4 подхода по 8-12 повторений, 80 кг\" или \"Жим лёжа: 4х8-12 80кг\".
- Для упражнений с весом тела вес можно не указывать.
- Не повторяй запрос пользователя и не отвечай одной фразой \"план создан\": сам план должен быть в writes.

Стиль записей: \"🍽️ Завтрак: ...\", \"🏋️ Жим лёжа: 4х8 80кг\", \"🗓️ План на сегодня: ...\".";

const PLAN_EXTRACTION_SYSTEM_PROMPT: &str = "\
Ты извлекаешь упражнения из текста плана тренировки.
Верни только валидный JSON без Markdown и пояснений:
{
  \"exercises\": [
    {
      \"name\": \"Название упражнения\",
      \"sets\": [
        {\"number\": 1, \"reps\": \"8-10\", \"weight_kg\": 80, \"rpe\": \"7-8\", \"rest_sec\": 90}
      ]
    }
  ]
}

Правила:
1. Только упражнения основной части. Разминку, заминку и советы пропускай.
2. \"4х8-10 80кг\" означает четыре подхода по 8-10 повторений с весом 80.
3. Если вес указан по подходам (\"1 подход 60кг, 2 подход 80кг\"), каждый подход отдельно.
4. Повторения всегда строкой: \"8-10\", \"12\", \"до отказа\".
5. Упражнения без веса: weight_kg = null.
6. Отдых переводи в секунды: \"90 сек\" = 90, \"2 мин\" = 120.
7. Ничего не придумывай.";

/// Notes snapshot and message for one turn.
#[derive(Debug, Clone)]
pub struct TurnPrompt<'a> {
    pub now_label: &'a str,
    pub today: NaiveDate,
    pub hint: Option<ModeHint>,
    pub classification: Option<&'a IntentClassification>,
    /// Rendered [`UserProfile`](crate::profile::UserProfile) block, if any.
    pub profile: Option<&'a str>,
    pub workouts: &'a str,
    pub meals: &'a str,
    pub plan: &'a str,
    pub message: &'a str,
}

pub fn turn_system_prompt() -> &'static str {
    TURN_SYSTEM_PROMPT
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        EMPTY_NOTE_PLACEHOLDER
    } else {
        text
    }
}

fn hint_label(hint: ModeHint) -> &'static str {
    match hint {
        ModeHint::Sets => "тренировки",
        ModeHint::Meals => "питание",
        ModeHint::Plan => "план",
    }
}

impl TurnPrompt<'_> {
    pub fn render(&self) -> String {
        let mode_line = match self.hint {
            Some(hint) => format!("mode_hint: {} ({})", hint.as_str(), hint_label(hint)),
            None => "mode_hint: none".to_string(),
        };
        let intent_line = match self.classification {
            Some(classification) => format!(
                "Классификация сообщения: {} (уверенность {:.2})\n",
                classification.intent.as_str(),
                classification.confidence
            ),
            None => String::new(),
        };
        let profile_section = match self.profile.map(str::trim) {
            Some(profile) if !profile.is_empty() => {
                format!("Профиль пользователя (учитывай в ответе и планах):\n{profile}\n\n")
            }
            _ => String::new(),
        };

        format!(
            "Текущее время: {now}\n\
             Сегодня: {today}\n\
             {mode_line}\n\
             {intent_line}\n\
             {profile_section}\
             Заметки за сегодня:\n\
             Тренировки:\n{workouts}\n\n\
             Питание:\n{meals}\n\n\
             План:\n{plan}\n\n\
             Сообщение пользователя:\n{message}\n\n\
             Верни JSON строго по формату.",
            now = self.now_label,
            today = self.today.format("%Y-%m-%d"),
            workouts = or_placeholder(self.workouts),
            meals = or_placeholder(self.meals),
            plan = or_placeholder(self.plan),
            message = self.message,
        )
    }
}

pub fn plan_extraction_system_prompt() -> &'static str {
    PLAN_EXTRACTION_SYSTEM_PROMPT
}

pub fn plan_extraction_user_prompt(plan_text: &str) -> String {
    format!(
        "Извлеки упражнения с подходами, весом, повторениями, RPE и отдыхом из плана:\n\n\
         {plan_text}\n\n\
         Верни JSON."
    )
}

/// Message used for system-initiated plan generation for a day.
///
/// With `personalized`, the request asks for the plan to follow the profile
/// block that the turn prompt carries.
pub fn plan_generation_request(d: NaiveDate, kind: NoteKind, personalized: bool) -> String {
    let day = d.format("%Y-%m-%d");
    let mut request = match kind {
        NoteKind::Meals => format!(
            "Составь план питания на {day}: 4-5 приёмов пищи с продуктами и граммовкой."
        ),
        _ => format!(
            "Составь план тренировок на {day}: 5-7 упражнений, у каждого строка вида \
             \"Название: 4 подхода по 8-12 повторений, 60 кг\"."
        ),
    };
    if personalized {
        request.push_str(" Учитывай профиль пользователя: цель, опыт, ограничения и оборудование.");
    }
    request
}

/// Templated note line recording `message` under `kind`.
pub fn synthesized_write_text(kind: NoteKind, message: &str) -> String {
    let message = strip_markup(message);
    match kind {
        NoteKind::Meals => format!("🍽️ Запись: {message}"),
        NoteKind::Workouts => format!("🏋️ Подходы/вес: {message}"),
        NoteKind::Plan => format!("🗓️ План: {message}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFocus {
    Training,
    Nutrition,
}

const NUTRITION_PLAN_MARKERS: &[&str] = &[
    "питани", "рацион", "меню", "диет", "еда", "meal", "diet", "nutrition", "menu",
];

impl PlanFocus {
    pub fn detect(message: &str) -> Self {
        let normalized = normalize_text(message);
        if NUTRITION_PLAN_MARKERS
            .iter()
            .any(|marker| normalized.contains(marker))
        {
            PlanFocus::Nutrition
        } else {
            PlanFocus::Training
        }
    }
}

/// Deterministic plan substituted when generated plan text is missing or degenerate.
///
/// The training template uses the long "N подхода по M повторений, W кг" form
/// so it parses cleanly back into a checklist.
pub fn fallback_plan(focus: PlanFocus, d: Option<NaiveDate>) -> String {
    let day = d
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "сегодня".to_string());
    match focus {
        PlanFocus::Training => format!(
            "🏋️ План тренировки на {day}:\n\n\
             1. Жим лёжа: 4 подхода по 8-12 повторений, 60 кг\n\
             2. Приседания со штангой: 4 подхода по 8-10 повторений, 70 кг\n\
             3. Тяга штанги в наклоне: 4 подхода по 8-10 повторений, 50 кг\n\
             4. Жим гантелей сидя: 3 подхода по 10-12 повторений, 16 кг\n\
             5. Подъём штанги на бицепс: 3 подхода по 10-12 повторений, 20 кг\n\
             6. Разгибания на трицепс в блоке: 3 подхода по 12-15 повторений, 15 кг\n\n\
             💪 Отдых между подходами: 60-90 секунд"
        ),
        PlanFocus::Nutrition => format!(
            "🗓️ План питания на {day}:\n\n\
             1. Завтрак: овсянка на молоке 80 г, 2 яйца, банан\n\
             2. Перекус: творог 5% 150 г, яблоко\n\
             3. Обед: гречка 100 г, куриная грудка 150 г, овощной салат\n\
             4. Перекус: натуральный йогурт 150 г, горсть орехов\n\
             5. Ужин: запечённая рыба 150 г, рис 70 г, тушёные овощи\n\n\
             💧 Вода: 2-2,5 литра в течение дня"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_prompt_marks_empty_notes_and_mode() {
        let prompt = TurnPrompt {
            now_label: "2026-03-14 09:30",
            today: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            hint: Some(ModeHint::Sets),
            classification: None,
            profile: None,
            workouts: "",
            meals: "овсянка",
            plan: "  ",
            message: "жим 4х8 80кг",
        }
        .render();

        assert!(prompt.contains("Сегодня: 2026-03-14"));
        assert!(prompt.contains("mode_hint: sets (тренировки)"));
        assert!(prompt.contains("Тренировки:\n(пусто)"));
        assert!(prompt.contains("Питание:\nовсянка"));
        assert!(prompt.contains("План:\n(пусто)"));
        assert!(prompt.ends_with("Верни JSON строго по формату."));
        assert!(!prompt.contains("Профиль пользователя"));
    }

    #[test]
    fn turn_prompt_carries_profile_block() {
        let prompt = TurnPrompt {
            now_label: "2026-03-14 09:30",
            today: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            hint: None,
            classification: None,
            profile: Some("Цель: набор массы\nТравмы/ограничения: колено"),
            workouts: "",
            meals: "",
            plan: "",
            message: "составь план на завтра",
        }
        .render();

        assert!(prompt.contains(
            "Профиль пользователя (учитывай в ответе и планах):\nЦель: набор массы\nТравмы/ограничения: колено\n\nЗаметки за сегодня:"
        ));
    }

    #[test]
    fn plan_generation_request_mentions_profile_only_when_known() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let plain = plan_generation_request(d, NoteKind::Workouts, false);
        assert!(plain.starts_with("Составь план тренировок на 2026-03-15"));
        assert!(!plain.contains("профиль"));
        assert!(plan_generation_request(d, NoteKind::Meals, true).contains("Учитывай профиль"));
    }

    #[test]
    fn synthesized_lines_embed_the_message() {
        assert_eq!(
            synthesized_write_text(NoteKind::Workouts, "жим лежа 4х8 80кг"),
            "🏋️ Подходы/вес: жим лежа 4х8 80кг"
        );
        assert_eq!(
            synthesized_write_text(NoteKind::Meals, "**овсянка**"),
            "🍽️ Запись: овсянка"
        );
    }

    #[test]
    fn plan_focus_detects_nutrition_requests() {
        assert_eq!(PlanFocus::detect("Составь план питания"), PlanFocus::Nutrition);
        assert_eq!(PlanFocus::detect("составь план на завтра"), PlanFocus::Training);
    }

    #[test]
    fn fallback_plans_are_substantial() {
        for focus in [PlanFocus::Training, PlanFocus::Nutrition] {
            assert!(fallback_plan(focus, None).chars().count() >= 50);
        }
        let dated = fallback_plan(
            PlanFocus::Training,
            NaiveDate::from_ymd_opt(2026, 3, 15),
        );
        assert!(dated.starts_with("🏋️ План тренировки на 2026-03-15:"));
    }
}
