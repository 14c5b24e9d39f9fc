//! Self-contained dashboard page. The initial control state is embedded as
//! JSON; views are fetched from the API and drawn with vega-embed (chart)
//! and Leaflet (map).

use crate::session::ControlsSnapshot;

const BOOTSTRAP_MARKER: &str = "__DASH_BOOTSTRAP__";

pub fn render(snapshot: &ControlsSnapshot) -> String {
    let blob = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    // keep the blob from closing the <script> element
    let blob = blob.replace("</", "<\\/");
    TEMPLATE.replace(BOOTSTRAP_MARKER, &blob)
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Merit order</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <style>
    :root { --bg: #fafafa; --panel: #fff; --border: #ddd; --accent: #3a6ea5; }
    body { font-family: system-ui, sans-serif; margin: 0; background: var(--bg); color: #222; }
    header { padding: 12px 20px; border-bottom: 1px solid var(--border); background: var(--panel); }
    header h1 { margin: 0; font-size: 1.3rem; }
    main { display: flex; gap: 16px; padding: 16px; align-items: flex-start; }
    .panel { background: var(--panel); border: 1px solid var(--border); border-radius: 6px; padding: 12px; }
    .controls { width: 320px; flex: none; }
    .results { flex: 1; min-width: 0; }
    .tabs { display: flex; gap: 4px; margin-bottom: 10px; }
    .tabs button { border: 1px solid var(--border); background: #eee; padding: 6px 12px; cursor: pointer; border-radius: 4px 4px 0 0; }
    .tabs button.active { background: var(--panel); border-bottom-color: var(--panel); font-weight: 600; }
    .tab { display: none; }
    .tab.active { display: block; }
    label { display: block; margin: 10px 0 4px; font-size: 0.9rem; }
    select[multiple] { width: 100%; height: 450px; }
    input[type=range] { width: 100%; }
    .price-row { margin-bottom: 6px; }
    .price-row span { float: right; font-variant-numeric: tabular-nums; }
    #map { width: 700px; height: 700px; }
    table { border-collapse: collapse; font-size: 0.9rem; }
    th, td { border: 1px solid var(--border); padding: 4px 8px; }
    td.num { text-align: right; font-variant-numeric: tabular-nums; }
    .error { color: #b00020; min-height: 1.2em; }
    .empty { color: #888; font-style: italic; }
  </style>
</head>
<body>
  <header><h1>Merit order</h1></header>
  <main>
    <div class="panel controls">
      <div class="tabs" id="control-tabs">
        <button data-tab="tab-plot" class="active">Plot parameters</button>
        <button data-tab="tab-prices">Fuel Prices (EUR/MWh)</button>
      </div>
      <div class="tab active" id="tab-plot">
        <label for="countries">Countries:</label>
        <select id="countries" multiple></select>
        <label>Operation type</label>
        <div id="modes"></div>
        <label for="carbon">Carbon price (EUR per tonne): <b id="carbon-value"></b></label>
        <input type="range" id="carbon" step="0.5">
      </div>
      <div class="tab" id="tab-prices">
        <button id="reset">Reset values</button>
        <div id="prices"></div>
      </div>
      <div class="error" id="error"></div>
    </div>
    <div class="panel results">
      <div class="tabs" id="result-tabs">
        <button data-tab="tab-merit" class="active">Merit order</button>
        <button data-tab="tab-map">Map</button>
        <button data-tab="tab-capacities">Capacities</button>
      </div>
      <div class="tab active" id="tab-merit"><div id="chart"></div></div>
      <div class="tab" id="tab-map"><div id="map"></div></div>
      <div class="tab" id="tab-capacities">
        <label><input type="checkbox" id="aggregate"> Aggregate by type</label>
        <div id="capacities"></div>
      </div>
    </div>
  </main>
<script>
const BOOT = __DASH_BOOTSTRAP__;
let leafletMap = null;
let markerLayer = null;

function $(id) { return document.getElementById(id); }

const ENTITIES = { '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' };
function esc(value) { return String(value).replace(/[&<>"']/g, c => ENTITIES[c]); }

function wireTabs(groupId) {
  const buttons = $(groupId).querySelectorAll('button');
  buttons.forEach(b => b.addEventListener('click', () => {
    buttons.forEach(o => { o.classList.remove('active'); $(o.dataset.tab).classList.remove('active'); });
    b.classList.add('active');
    $(b.dataset.tab).classList.add('active');
    if (b.dataset.tab === 'tab-map' && leafletMap) leafletMap.invalidateSize();
  }));
}

async function send(input) {
  $('error').textContent = '';
  const res = await fetch('/api/input', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(input),
  });
  const payload = await res.json();
  if (!res.ok) { $('error').textContent = payload.error; return; }
  payload.recompute.views.forEach(drawView);
  syncControls(payload.controls);
}

function buildControls(c) {
  const sel = $('countries');
  c.countries_available.forEach(name => {
    const opt = document.createElement('option');
    opt.value = name; opt.textContent = name;
    sel.appendChild(opt);
  });
  sel.addEventListener('change', () => {
    send({ input: 'select_countries', countries: Array.from(sel.selectedOptions).map(o => o.value) });
  });

  c.modes.forEach(([mode, label]) => {
    const id = 'mode-' + mode;
    const wrap = document.createElement('span');
    wrap.innerHTML = `<input type="radio" name="mode" id="${id}" value="${mode}"> <label for="${id}" style="display:inline">${label}</label> `;
    $('modes').appendChild(wrap);
    $(id).addEventListener('change', () => send({ input: 'set_operation_mode', mode }));
  });

  const carbon = $('carbon');
  carbon.min = c.carbon_price_bounds[0];
  carbon.max = c.carbon_price_bounds[1];
  carbon.addEventListener('input', () => { $('carbon-value').textContent = carbon.value; });
  carbon.addEventListener('change', () => send({ input: 'set_carbon_price', value: Number(carbon.value) }));

  c.fuel_prices.forEach(p => {
    const row = document.createElement('div');
    row.className = 'price-row';
    const id = 'price-' + p.technology.replace(/[^A-Za-z0-9]/g, '_');
    row.innerHTML = `<label for="${id}">${esc(p.technology)} <span id="${id}-value"></span></label>
      <input type="range" id="${id}" min="${p.min}" max="${p.max}" step="0.5">`;
    $('prices').appendChild(row);
    const input = row.querySelector('input');
    input.dataset.technology = p.technology;
    input.addEventListener('input', () => { $(id + '-value').textContent = input.value; });
    input.addEventListener('change', () => send({ input: 'set_fuel_price', technology: p.technology, value: Number(input.value) }));
  });

  $('reset').addEventListener('click', () => send({ input: 'reset_prices' }));
  $('aggregate').addEventListener('change', e => send({ input: 'set_aggregate_by_type', value: e.target.checked }));
}

function syncControls(c) {
  const selected = new Set(c.selected);
  Array.from($('countries').options).forEach(o => { o.selected = selected.has(o.value); });
  const radio = $('mode-' + c.mode);
  if (radio) radio.checked = true;
  $('carbon').value = c.carbon_price;
  $('carbon-value').textContent = c.carbon_price;
  $('aggregate').checked = c.aggregate_by_type;
  $('prices').querySelectorAll('input').forEach(input => {
    const p = c.fuel_prices.find(f => f.technology === input.dataset.technology);
    if (p) { input.value = p.live; $(input.id + '-value').textContent = p.live; }
  });
}

function drawChart(chart) {
  if (chart.rows === 0) { $('chart').innerHTML = '<p class="empty">No generators for this selection</p>'; return; }
  vegaEmbed('#chart', chart.spec, { actions: false });
}

function drawMap(view) {
  if (!leafletMap) {
    $('map').style.width = view.width + 'px';
    $('map').style.height = view.height + 'px';
    leafletMap = L.map('map');
    L.tileLayer(view.tiles, { attribution: view.attribution }).addTo(leafletMap);
    markerLayer = L.layerGroup().addTo(leafletMap);
  }
  markerLayer.clearLayers();
  if (view.center) leafletMap.setView(view.center, view.zoom);
  view.markers.forEach(m => {
    L.circle([m.lat, m.lon], { radius: m.radius_m, color: m.color, fill: true, fillColor: m.color })
      .bindPopup(esc(m.popup).replace(/\n/g, '<br>'))
      .addTo(markerLayer);
  });
}

function drawTable(table) {
  if (table.rows.length === 0) { $('capacities').innerHTML = '<p class="empty">No generators for this selection</p>'; return; }
  const head = '<tr>' + table.columns.map(c => `<th>${esc(c)}</th>`).join('') + '</tr>';
  const body = table.rows.map(r => {
    const cells = [`<td>${esc(r.key)}</td>`];
    if (!table.aggregated) cells.push(`<td>${esc(r.technology ?? '')}</td>`);
    cells.push(`<td class="num">${r.capacity_mw.toFixed(1)}</td>`);
    return '<tr>' + cells.join('') + '</tr>';
  }).join('');
  $('capacities').innerHTML = `<table>${head}${body}</table>`;
}

function drawView(v) {
  if (v.view === 'merit_order') drawChart(v.artifact);
  else if (v.view === 'map') drawMap(v.artifact);
  else if (v.view === 'capacities') drawTable(v.artifact);
}

async function init() {
  wireTabs('control-tabs');
  wireTabs('result-tabs');
  buildControls(BOOT);
  syncControls(BOOT);
  const res = await fetch('/api/views');
  const payload = await res.json();
  payload.views.forEach(drawView);
}

init();
</script>
</body>
</html>
"##;
