use std::sync::Arc;

use chatflow::engine::FlowEngine;
use chatflow::flow::Flow;
use chatflow::flow::store::InMemoryFlowStore;
use chatflow::message::{TurnReply, TurnRequest};
use chatflow::store::memory::InMemoryStateStore;

const DEMO_FLOW: &str = include_str!("../flows/demo.json");

fn demo_engine() -> FlowEngine {
    let flows = InMemoryFlowStore::new();
    flows.register(Flow::from_json(DEMO_FLOW).unwrap());
    FlowEngine::new(Arc::new(flows), Arc::new(InMemoryStateStore::new(3600)))
}

async fn turn(engine: &FlowEngine, conversation: &str, input: Option<&str>) -> TurnReply {
    let mut request = TurnRequest::new(conversation, "demo");
    if let Some(text) = input {
        request = request.with_input(text);
    }
    engine.run(request).await.unwrap()
}

#[tokio::test]
async fn first_contact_greets_and_shows_the_menu() {
    let engine = demo_engine();
    let reply = turn(&engine, "c1", None).await;

    assert_eq!(reply.messages.len(), 2);
    assert_eq!(reply.messages[0], "👋 ¡Bienvenido! Soy tu asistente virtual.");
    assert!(reply.messages[1].starts_with("¿Qué deseas hacer?"));
    assert!(reply.messages[1].contains("  2. Registrarme"));
    assert!(!reply.handoff);
}

#[tokio::test]
async fn invalid_menu_selection_relists_without_advancing() {
    let engine = demo_engine();
    turn(&engine, "c1", None).await;

    let reply = turn(&engine, "c1", Some("99")).await;
    assert_eq!(reply.messages[0], "❌ Opción inválida. Por favor, seleccione una opción válida.");
    assert!(reply.messages[1].contains("  1. Consultar servicios"));
    assert!(!reply.handoff);

    let states = engine.active_conversations().await;
    assert_eq!(states[0].current_step.as_deref(), Some("menu_principal"));
}

#[tokio::test]
async fn dynamic_data_lists_services_and_returns_to_the_menu() {
    let engine = demo_engine();
    turn(&engine, "c1", None).await;

    let reply = turn(&engine, "c1", Some("1")).await;
    assert!(reply.messages[0].starts_with("Servicios disponibles:"));
    assert!(reply.messages[0].contains("  • Servicio B - $200"));
    // The flow loops back and blocks on the menu again.
    assert!(reply.messages[1].starts_with("¿Qué deseas hacer?"));
    assert!(!reply.handoff);
}

#[tokio::test]
async fn short_dni_blocks_the_validation_step() {
    let engine = demo_engine();
    turn(&engine, "c1", None).await;
    turn(&engine, "c1", Some("registro")).await;

    let reply = turn(&engine, "c1", Some("1234")).await;
    assert_eq!(reply.messages, vec!["❌ DNI inválido. Debe tener 8 dígitos."]);
    assert!(!reply.handoff);

    let states = engine.active_conversations().await;
    assert_eq!(states[0].current_step.as_deref(), Some("validar_dni"));
}

#[tokio::test]
async fn full_registration_journey() {
    let engine = demo_engine();

    let reply = turn(&engine, "c1", None).await;
    assert!(reply.messages[1].contains("Registrarme"));

    // Menu selection by option number; the input prompt follows.
    let reply = turn(&engine, "c1", Some("2")).await;
    assert_eq!(reply.messages, vec!["Por favor, ingresa tu DNI (8 dígitos):"]);

    // Valid DNI chains straight into the form.
    let reply = turn(&engine, "c1", Some("12345678")).await;
    assert_eq!(
        reply.messages,
        vec![
            "✅ DNI válido",
            "Vamos a completar tu registro.",
            "📝 Nombre completo (*)"
        ]
    );

    let reply = turn(&engine, "c1", Some("Ana Díaz")).await;
    assert_eq!(reply.messages, vec!["✅ Guardado.", "📝 Correo electrónico (*)"]);

    // A rejected value re-prompts the same field.
    let reply = turn(&engine, "c1", Some("correo-malo")).await;
    assert_eq!(reply.messages, vec!["❌ Ingresa un correo válido.", "📝 Correo electrónico (*)"]);

    let reply = turn(&engine, "c1", Some("ana@example.com")).await;
    assert_eq!(reply.messages, vec!["✅ Guardado.", "📝 Edad (*)"]);

    // Last field completes the form; the conditional routes on the collected
    // age and the confirmation renders the collected variables.
    let reply = turn(&engine, "c1", Some("70")).await;
    assert_eq!(
        reply.messages,
        vec![
            "✅ Registro completo, Ana Díaz. Aplica el descuento senior.",
            "Gracias por tu visita. ¡Hasta pronto! 👋"
        ]
    );
    assert!(reply.handoff);
}

#[tokio::test]
async fn under_65_takes_the_regular_confirmation_branch() {
    let engine = demo_engine();
    turn(&engine, "c1", None).await;
    turn(&engine, "c1", Some("registro")).await;
    turn(&engine, "c1", Some("87654321")).await;
    turn(&engine, "c1", Some("Luis Paredes")).await;
    turn(&engine, "c1", Some("luis@example.com")).await;

    let reply = turn(&engine, "c1", Some("34")).await;
    assert_eq!(reply.messages[0], "✅ Registro completo, Luis Paredes. Te contactaremos a luis@example.com.");
    assert!(reply.handoff);
}

#[tokio::test]
async fn conversation_restarts_after_handoff_keeping_variables() {
    let engine = demo_engine();
    turn(&engine, "c1", None).await;
    let ended = turn(&engine, "c1", Some("salir")).await;
    assert!(ended.handoff);

    // The next message starts the flow from the top again.
    let reply = turn(&engine, "c1", None).await;
    assert_eq!(reply.messages[0], "👋 ¡Bienvenido! Soy tu asistente virtual.");
    assert!(!reply.handoff);
}

#[tokio::test]
async fn conversations_are_isolated_from_each_other() {
    let engine = demo_engine();
    turn(&engine, "ana", None).await;
    turn(&engine, "ana", Some("registro")).await;

    // A brand-new conversation is unaffected by ana's progress.
    let reply = turn(&engine, "luis", None).await;
    assert_eq!(reply.messages[0], "👋 ¡Bienvenido! Soy tu asistente virtual.");

    let mut steps: Vec<Option<String>> = engine
        .active_conversations()
        .await
        .into_iter()
        .map(|s| s.current_step)
        .collect();
    steps.sort();
    assert_eq!(
        steps,
        vec![Some("menu_principal".to_string()), Some("pedir_dni".to_string())]
    );
}

#[tokio::test]
async fn legacy_flow_vocabulary_still_runs() {
    let legacy = r#"{
        "id": "demo",
        "start_step": "bienvenida",
        "error_step": "fin",
        "steps": {
            "bienvenida": {"type": "message", "content": "Hola", "next": "opciones"},
            "opciones": {
                "type": "options",
                "content": "Elige:",
                "options": [
                    {"label": "Servicios", "value": "servicios", "next": "servicios"},
                    {"label": "Salir", "value": "salir", "next": "fin"}
                ]
            },
            "servicios": {
                "type": "dynamicService",
                "content": "Catálogo:",
                "service": "catalogo",
                "next": "decidir"
            },
            "decidir": {
                "type": "conditional",
                "condition": "\"si\" == \"si\"",
                "ifTrue": "fin",
                "ifFalse": "opciones"
            },
            "fin": {"type": "end", "content": "Adiós"}
        }
    }"#;

    let flows = InMemoryFlowStore::new();
    flows.register(Flow::from_json(legacy).unwrap());
    let engine = FlowEngine::new(Arc::new(flows), Arc::new(InMemoryStateStore::new(3600)));

    let reply = turn(&engine, "c1", Some("1")).await;
    assert_eq!(reply.messages[0], "Hola");
    assert!(reply.messages[1].starts_with("Catálogo:"));
    assert_eq!(reply.messages[2], "Adiós");
    assert!(reply.handoff);
}
